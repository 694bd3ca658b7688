//! Pulse command: one actuator call, exactly as a voice command makes it.

use serde::Serialize;
use voxbridge_api::{ActuatorClient, TransportConfig};
use voxbridge_core::{DispatchOutcome, DispatchReport, dispatch_command};

use crate::cli::{GlobalOpts, OutputFormat, PulseArgs};
use crate::error::CliError;
use crate::output;

use super::util::NodeContext;

#[derive(Serialize)]
struct PulseSummary<'a> {
    device: &'a str,
    state: bool,
    target: String,
    status: u16,
    body: &'a str,
}

pub async fn handle(args: PulseArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = NodeContext::load(global)?;
    let registry = ctx.open_registry()?;
    let dispatch = &ctx.bridge.dispatch;

    let transport = TransportConfig::default().with_timeout(dispatch.http_timeout);
    let http = ActuatorClient::new(&dispatch.actuator_host, &transport)?;

    let report = dispatch_command(&registry, &http, dispatch, &args.name, !args.off).await;
    let preview_len = dispatch.response_preview_len;
    finish(report, ctx.out, preview_len)
}

fn finish(
    report: DispatchReport,
    out: output::OutputOpts,
    preview_len: usize,
) -> Result<(), CliError> {
    let ok = report.is_success();
    let target = report
        .target
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let response = match report.outcome {
        DispatchOutcome::Completed(response) => response,
        DispatchOutcome::UnknownDevice => {
            return Err(CliError::NotFound {
                name: report.device,
            });
        }
        DispatchOutcome::Failed(voxbridge_api::Error::Timeout { timeout_ms }) => {
            return Err(CliError::Timeout { timeout_ms });
        }
        DispatchOutcome::Failed(source) => {
            return Err(CliError::ConnectionFailed {
                url: target,
                source,
            });
        }
    };

    let preview = response.preview(preview_len);
    let summary = PulseSummary {
        device: &report.device,
        state: report.state,
        target,
        status: response.status,
        body: preview,
    };
    let rendered = output::render_single(
        out.format,
        &summary,
        |s| {
            format!(
                "{} {} -> {} (HTTP {})",
                output::status_marker(ok, out.color),
                s.device,
                s.target,
                s.status
            )
        },
        |s| s.status.to_string(),
    )?;
    output::print_output(&rendered, out.quiet);
    if out.format == OutputFormat::Table {
        output::print_output(preview, out.quiet);
    }

    if ok {
        Ok(())
    } else {
        Err(CliError::ActuatorStatus {
            status: response.status,
            body: preview.to_owned(),
        })
    }
}
