use crate::candidate::encode_data_uri;
use crate::error::ClassifyError;
use crate::prediction::{ExampleSource, PredictionBackend};
use crate::workflow::{Effect, Event, Workflow};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::instrument;

/// Posts events into a running [`Runtime`].
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<Event>);

impl EventSender {
    /// Returns `false` once the runtime has stopped.
    pub fn send(&self, event: Event) -> bool {
        self.0.send(event).is_ok()
    }
}

#[derive(Clone)]
struct Ports {
    backend: Arc<dyn PredictionBackend>,
    examples: Arc<dyn ExampleSource>,
}

/// Single event loop owning the [`Workflow`].
///
/// Events are applied one at a time; effects run as spawned tasks that each
/// post exactly one completion event back into the loop.
pub struct Runtime {
    workflow: Workflow,
    ports: Ports,
    sender: mpsc::UnboundedSender<Event>,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl Runtime {
    pub fn new(backend: Arc<dyn PredictionBackend>, examples: Arc<dyn ExampleSource>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            workflow: Workflow::new(),
            ports: Ports { backend, examples },
            sender,
            receiver,
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender(self.sender.clone())
    }

    /// Runs until `shutdown_rx` fires, calling `render` after every event.
    /// Returns the final workflow.
    pub async fn run<R>(
        mut self,
        mut render: R,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Workflow
    where
        R: FnMut(&Workflow),
    {
        render(&self.workflow);

        loop {
            tokio::select! {
                Some(event) = self.receiver.recv() => {
                    tracing::debug!("Handling event {:?}", event);
                    let effects = self.workflow.transition(event);
                    render(&self.workflow);
                    for effect in effects {
                        self.spawn_effect(effect);
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Event loop received shutdown signal");
                    break;
                }
            }
        }

        self.workflow
    }

    fn spawn_effect(&self, effect: Effect) {
        tracing::debug!("Running effect {}", effect.to_display_string());
        let ports = self.ports.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Some(event) = run_effect(effect, ports).await {
                if sender.send(event).is_err() {
                    tracing::debug!("Event loop closed before effect completed");
                }
            }
        });
    }
}

#[instrument(skip_all)]
async fn run_effect(effect: Effect, ports: Ports) -> Option<Event> {
    match effect {
        Effect::ResolvePreview {
            candidate,
            payload,
            mime_type,
        } => {
            match tokio::task::spawn_blocking(move || encode_data_uri(&mime_type, &payload)).await
            {
                Ok(source) => Some(Event::PreviewResolved { candidate, source }),
                Err(e) => {
                    tracing::error!(
                        "Preview decoding for candidate {} failed: {:?}",
                        candidate,
                        e
                    );
                    None
                }
            }
        }
        Effect::FetchExample { url, name } => {
            let result = ports.examples.fetch_example(&url, &name).await;
            Some(Event::ExampleFetched(result))
        }
        Effect::SubmitPrediction { ticket, candidate } => {
            // The request runs in its own task so that a panic still settles
            // the session.
            let backend = ports.backend.clone();
            let result = tokio::spawn(async move { backend.predict(&candidate).await })
                .await
                .unwrap_or_else(|e| {
                    Err(ClassifyError::Network(format!(
                        "prediction request aborted: {}",
                        e
                    )))
                });
            Some(Event::PredictionSettled { ticket, result })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{ImageCandidate, RawFile};
    use crate::prediction::PredictionResult;
    use crate::render::Status;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct GatedBackend {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl PredictionBackend for GatedBackend {
        async fn predict(
            &self,
            _candidate: &ImageCandidate,
        ) -> Result<PredictionResult, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(PredictionResult {
                top_label: "Cars".to_string(),
                top_confidence: 0.92,
                distribution: HashMap::from([("Cars".to_string(), 0.92)]),
            })
        }
    }

    struct PanickingBackend;

    #[async_trait]
    impl PredictionBackend for PanickingBackend {
        async fn predict(
            &self,
            _candidate: &ImageCandidate,
        ) -> Result<PredictionResult, ClassifyError> {
            panic!("backend exploded")
        }
    }

    struct NoExamples;

    #[async_trait]
    impl ExampleSource for NoExamples {
        async fn fetch_example(
            &self,
            url: &str,
            _name: &str,
        ) -> Result<RawFile, ClassifyError> {
            Err(ClassifyError::AcquisitionFetch(format!("{} returned HTTP 404", url)))
        }
    }

    fn start(
        backend: Arc<dyn PredictionBackend>,
    ) -> (
        EventSender,
        mpsc::UnboundedReceiver<crate::render::View>,
        broadcast::Sender<()>,
        tokio::task::JoinHandle<Workflow>,
    ) {
        let runtime = Runtime::new(backend, Arc::new(NoExamples));
        let sender = runtime.sender();
        let (views_tx, views_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(runtime.run(
            move |workflow: &Workflow| {
                let _ = views_tx.send(workflow.view());
            },
            shutdown_rx,
        ));
        (sender, views_rx, shutdown_tx, handle)
    }

    async fn wait_for<F>(views: &mut mpsc::UnboundedReceiver<crate::render::View>, predicate: F)
    where
        F: Fn(&crate::render::View) -> bool,
    {
        loop {
            let view = views.recv().await.expect("runtime stopped");
            if predicate(&view) {
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_second_classify_while_submitting_sends_nothing() {
        let backend = Arc::new(GatedBackend {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
        });
        let (sender, mut views, shutdown_tx, handle) = start(backend.clone());

        sender.send(Event::FileSelected(RawFile::new("car.jpg", vec![1u8, 2, 3])));
        sender.send(Event::ClassifyRequested);
        sender.send(Event::ClassifyRequested);
        wait_for(&mut views, |v| v.status == Status::Analyzing).await;

        while backend.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        sender.send(Event::ClassifyRequested);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        backend.gate.notify_one();
        wait_for(&mut views, |v| matches!(v.status, Status::Done { .. })).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        shutdown_tx.send(()).unwrap();
        let workflow = handle.await.unwrap();
        assert_eq!(workflow.state().name(), "Succeeded");
    }

    #[tokio::test]
    async fn test_preview_is_resolved() {
        let backend = Arc::new(GatedBackend {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
        });
        let (sender, mut views, shutdown_tx, handle) = start(backend);

        sender.send(Event::FileSelected(RawFile::with_mime_type(
            "car.png",
            "image/png",
            b"abc".to_vec(),
        )));
        wait_for(&mut views, |v| {
            v.candidate.as_ref().is_some_and(|c| c.preview_ready)
        })
        .await;

        shutdown_tx.send(()).unwrap();
        let workflow = handle.await.unwrap();
        assert_eq!(
            workflow.state().candidate().and_then(|c| c.displayable_source()),
            Some("data:image/png;base64,YWJj")
        );
    }

    #[tokio::test]
    async fn test_panicking_backend_still_settles() {
        let (sender, mut views, shutdown_tx, handle) = start(Arc::new(PanickingBackend));

        sender.send(Event::FileSelected(RawFile::new("car.jpg", vec![1u8])));
        sender.send(Event::ClassifyRequested);
        wait_for(&mut views, |v| matches!(v.status, Status::Error(_))).await;

        shutdown_tx.send(()).unwrap();
        let workflow = handle.await.unwrap();
        assert_eq!(workflow.state().name(), "Failed");
    }

    #[tokio::test]
    async fn test_failed_example_surfaces_notice() {
        let backend = Arc::new(GatedBackend {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
        });
        let (sender, mut views, shutdown_tx, handle) = start(backend);

        sender.send(Event::ExampleRequested {
            url: "http://assets/Cars.jpg".to_string(),
            name: "car-example.jpg".to_string(),
        });
        wait_for(&mut views, |v| v.notice.is_some()).await;

        shutdown_tx.send(()).unwrap();
        let workflow = handle.await.unwrap();
        assert_eq!(workflow.state().name(), "Idle");
    }
}
