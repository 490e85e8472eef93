//! A `tracing_subscriber::Layer` that captures log lines emitted from
//! within a `#[instrument(fields(deployment_id = %id))]`-annotated span and
//! hands them to a [`LogRecorder`], keyed by deployment id. §9.
//!
//! Grounded directly on the teacher's `deploy_layer.rs`: the same
//! span-scoped `ScopeDetails`/`JsonVisitor` pattern, narrowed from a full
//! state-transition log to plain captured output, since transition logging
//! here is handled by the orchestrator persisting `DeploymentStatus`
//! directly rather than inferring it from span names.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use nebula_core::DeploymentId;
use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Receives one formatted line per captured event.
pub trait LogRecorder: Send + Sync {
    fn record(&self, deployment_id: DeploymentId, line: String);
}

/// Keeps captured lines in memory, keyed by deployment id, until the
/// orchestrator snapshots them into a `Deployment.logs` on a terminal
/// transition. §9 "stored log capture".
#[derive(Default)]
pub struct InMemoryLogRecorder {
    lines: Mutex<HashMap<DeploymentId, Vec<String>>>,
}

impl InMemoryLogRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the accumulated lines for `deployment_id`,
    /// newline-joined, or `None` if nothing was ever captured.
    pub fn take(&self, deployment_id: DeploymentId) -> Option<String> {
        let mut lines = self.lines.lock().unwrap();
        let captured = lines.remove(&deployment_id)?;
        if captured.is_empty() {
            return None;
        }
        Some(captured.join("\n"))
    }
}

impl LogRecorder for InMemoryLogRecorder {
    fn record(&self, deployment_id: DeploymentId, line: String) {
        self.lines.lock().unwrap().entry(deployment_id).or_default().push(line);
    }
}

/// Lets the same recorder be shared between the [`DeployLayer`] and
/// whatever owns the canonical `Arc` (the orchestrator, here).
impl LogRecorder for std::sync::Arc<InMemoryLogRecorder> {
    fn record(&self, deployment_id: DeploymentId, line: String) {
        (**self).record(deployment_id, line);
    }
}

pub struct DeployLayer<R: LogRecorder + 'static> {
    recorder: R,
}

impl<R: LogRecorder + 'static> DeployLayer<R> {
    pub fn new(recorder: R) -> Self {
        Self { recorder }
    }
}

#[derive(Debug, Default, Clone)]
struct ScopeDetails {
    deployment_id: Option<DeploymentId>,
}

const DEPLOYMENT_ID_FIELD: &str = "deployment_id";

impl<R, S> Layer<S> for DeployLayer<R>
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    R: LogRecorder + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if attrs.metadata().fields().field(DEPLOYMENT_ID_FIELD).is_none() {
            return;
        }
        let mut visitor = DeploymentIdVisitor::default();
        attrs.record(&mut visitor);

        let span = ctx.span(id).expect("span must exist in on_new_span");
        span.extensions_mut().insert(ScopeDetails {
            deployment_id: visitor.deployment_id,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let Some(scope) = ctx.event_scope(event) else {
            return;
        };

        for span in scope.from_root() {
            let extensions = span.extensions();
            let Some(details) = extensions.get::<ScopeDetails>() else {
                continue;
            };
            let Some(deployment_id) = details.deployment_id else {
                continue;
            };

            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            let line = visitor.message.unwrap_or_default();
            if !line.is_empty() {
                self.recorder.record(deployment_id, line);
            }
            break;
        }
    }
}

#[derive(Default)]
struct DeploymentIdVisitor {
    deployment_id: Option<DeploymentId>,
}

impl Visit for DeploymentIdVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == DEPLOYMENT_ID_FIELD {
            self.deployment_id = DeploymentId::from_str(&format!("{value:?}").trim_matches('"')).ok();
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == DEPLOYMENT_ID_FIELD {
            self.deployment_id = DeploymentId::from_str(value).ok();
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing::info;
    use tracing_subscriber::prelude::*;

    #[derive(Default)]
    struct VecRecorder(Mutex<Vec<(DeploymentId, String)>>);

    impl LogRecorder for Arc<VecRecorder> {
        fn record(&self, deployment_id: DeploymentId, line: String) {
            self.0.lock().unwrap().push((deployment_id, line));
        }
    }

    #[test]
    fn captures_events_within_an_instrumented_span() {
        let recorder = Arc::new(VecRecorder::default());
        let subscriber = tracing_subscriber::registry().with(DeployLayer::new(recorder.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let deployment_id = DeploymentId::new();
            let span = tracing::info_span!("deploy", deployment_id = %deployment_id);
            let _guard = span.enter();
            info!("building image");
        });

        let captured = recorder.0.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].1, "building image");
    }

    #[test]
    fn events_outside_any_instrumented_span_are_ignored() {
        let recorder = Arc::new(VecRecorder::default());
        let subscriber = tracing_subscriber::registry().with(DeployLayer::new(recorder.clone()));

        tracing::subscriber::with_default(subscriber, || {
            info!("not in a deployment span");
        });

        assert!(recorder.0.lock().unwrap().is_empty());
    }
}
