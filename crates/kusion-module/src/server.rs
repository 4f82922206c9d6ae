//! Plugin-side serve loop
//!
//! A module binary implements [`Module`] and hands it to [`serve`], which
//! answers request frames on stdin with reply frames on stdout until stdin
//! closes. Logs must go to stderr.

use crate::error::Result;
use crate::protocol::{GeneratorRequest, GeneratorResponse, ReplyFrame, RequestFrame};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

/// Generation logic of one module.
#[async_trait]
pub trait Module: Send + Sync {
    async fn generate(&self, request: GeneratorRequest) -> anyhow::Result<GeneratorResponse>;
}

/// Serve `module` over the process's stdin/stdout.
pub async fn serve<M: Module>(module: M) -> Result<()> {
    serve_io(&module, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve `module` over an arbitrary line-oriented transport.
pub async fn serve_io<M, R, W>(module: &M, reader: R, mut writer: W) -> Result<()>
where
    M: Module + ?Sized,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<RequestFrame>(&line) {
            Ok(frame) => {
                let trace_id = frame.metadata.trace_id;
                info!(
                    trace_id = %trace_id,
                    module = %frame.metadata.module_name,
                    project = %frame.request.project,
                    stack = %frame.request.stack,
                    app = %frame.request.app,
                    "Generate request received"
                );
                match module.generate(frame.request).await {
                    Ok(response) => ReplyFrame::ok(trace_id, response),
                    Err(e) => {
                        error!(trace_id = %trace_id, error = %e, "Generate failed");
                        ReplyFrame::err(trace_id, format!("{:#}", e))
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Malformed request frame");
                ReplyFrame::err("", format!("malformed request frame: {}", e))
            }
        };

        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }

    info!("Request stream closed, module exiting");
    Ok(())
}
