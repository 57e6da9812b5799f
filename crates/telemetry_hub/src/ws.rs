use actix_web::{web, HttpRequest, HttpResponse};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::hub::{topic_from_request, Hub};

/// `GET /ws?topic=<t>`, subscribing to the query-string topic, or the
/// wildcard if none is given (§6).
pub async fn ws_index(req: HttpRequest, stream: web::Payload, hub: web::Data<Hub>) -> actix_web::Result<HttpResponse> {
    let query_topic = web::Query::<std::collections::HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.get("topic").cloned());
    upgrade(req, stream, hub, topic_from_request(None, query_topic.as_deref())).await
}

/// `GET /ws/inference/{topic}`, subscribing to the named path segment,
/// e.g. `epp-decisions`, `gpu-metrics`, `scaling-events` (§6).
pub async fn ws_named_topic(
    req: HttpRequest,
    stream: web::Payload,
    hub: web::Data<Hub>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    upgrade(req, stream, hub, path.into_inner()).await
}

async fn upgrade(req: HttpRequest, stream: web::Payload, hub: web::Data<Hub>, topic: String) -> actix_web::Result<HttpResponse> {
    let (response, session, mut msg_stream) = actix_ws::handle(&req, stream)?;
    let hub = hub.into_inner();
    let (client_id, mut outbound) = hub.register(vec![topic.clone()]).await;
    debug!(client = client_id, topic, "telemetry websocket client connected");

    actix_web::rt::spawn(async move {
        // Write task: drains the client's send buffer onto the socket (§4.5).
        let write_task = actix_web::rt::spawn({
            let mut session = session.clone();
            async move {
                while let Some(frame) = outbound.recv().await {
                    let body = match serde_json::to_string(&frame) {
                        Ok(body) => body,
                        Err(e) => {
                            warn!(error = %e, "failed to serialize telemetry frame");
                            continue;
                        }
                    };
                    if session.text(body).await.is_err() {
                        break;
                    }
                }
                let _ = session.close(None).await;
            }
        });

        // Read task: observes the socket only to detect close/error (§4.5).
        while let Some(Ok(msg)) = msg_stream.next().await {
            if let actix_ws::Message::Close(_) = msg {
                break;
            }
        }

        hub.deregister(client_id).await;
        write_task.abort();
        debug!(client = client_id, "telemetry websocket client disconnected");
    });

    Ok(response)
}
