//! HTTP server for the web API
//!
//! Each request is handled on its own thread; message retrieval inside a
//! request fans out on the retriever's worker pool.

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use mail::MailProvider;
use std::io::Read;
use std::sync::Arc;
use tiny_http::{Header, Request, Response, Server};

use crate::api::{ApiContext, ApiRequest, ApiResponse, handle};

/// Serve the API on `addr` until the process exits
pub fn serve<P: MailProvider + 'static>(addr: &str, ctx: ApiContext<P>) -> Result<()> {
    let server = Server::http(addr).map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
    info!("Listening on http://{}", addr);

    let ctx = Arc::new(ctx);
    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        std::thread::spawn(move || {
            if let Err(e) = respond(&ctx, request) {
                warn!("Failed to answer request: {:#}", e);
            }
        });
    }
    Ok(())
}

fn respond<P: MailProvider>(ctx: &ApiContext<P>, mut request: Request) -> Result<()> {
    let api_request = read_request(&mut request)?;
    let response = handle(ctx, &api_request);
    debug!(
        "{} {} -> {}",
        api_request.method, api_request.url, response.status
    );
    request
        .respond(to_http(&response))
        .context("Failed to write response")
}

fn read_request(request: &mut Request) -> Result<ApiRequest> {
    let authorization = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_string());

    let mut body = String::new();
    request
        .as_reader()
        .read_to_string(&mut body)
        .context("Failed to read request body")?;

    Ok(ApiRequest {
        method: request.method().as_str().to_string(),
        url: request.url().to_string(),
        authorization,
        body,
    })
}

fn to_http(response: &ApiResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut http = Response::from_string(response.body.to_string()).with_status_code(response.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        http.add_header(header);
    }
    http
}
