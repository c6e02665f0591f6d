//! Lambda runtime entry point

use keyrotator_core::RotationEvent;
use keyrotator_rotation::RotationHandler;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::info;

/// Serve rotation events until the runtime shuts the function down
pub async fn run(handler: Arc<RotationHandler>) -> Result<(), Error> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<RotationEvent>| {
        let handler = handler.clone();
        async move { handle(&handler, event).await }
    }))
    .await
}

/// The rotation framework expects a null result; failures are raised
async fn handle(handler: &RotationHandler, event: LambdaEvent<RotationEvent>) -> Result<(), Error> {
    let (payload, context) = event.into_parts();
    info!(
        request_id = %context.request_id,
        secret_id = %payload.secret_id,
        token = %payload.client_request_token,
        step = %payload.step,
        "Received rotation event"
    );

    let outcome = handler.handle_event(payload).await?;
    info!(request_id = %context.request_id, outcome = ?outcome, "Rotation step complete");
    Ok(())
}
