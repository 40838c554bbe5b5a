//! [`ReflectionChannel`] over `grpc.reflection.v1alpha.ServerReflection`.

use super::{ReflectionChannel, ReflectionQuery, ReflectionReply};
use crate::error::{Error, Result};
use tonic::transport::{Channel, Endpoint};
use tonic_reflection::pb::v1alpha::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1alpha::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1alpha::server_reflection_response::MessageResponse;
use tonic_reflection::pb::v1alpha::{ServerReflectionRequest, ServerReflectionResponse};
use tracing::trace;

/// Reflection channel backed by a `tonic` client.
///
/// Every [`exchange`](ReflectionChannel::exchange) opens its own
/// `ServerReflectionInfo` stream, sends exactly one request and reads at most
/// one response.
#[derive(Debug, Clone)]
pub struct GrpcReflectionChannel {
    client: ServerReflectionClient<Channel>,
}

impl GrpcReflectionChannel {
    /// Wraps an already-connected channel
    pub fn new(channel: Channel) -> Self {
        Self {
            client: ServerReflectionClient::new(channel),
        }
    }

    /// Dials a configured endpoint.
    ///
    /// Timeouts and other transport settings belong on the endpoint.
    pub async fn connect(endpoint: Endpoint) -> Result<Self> {
        let target = endpoint.uri().to_string();
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::connect(target, e))?;
        Ok(Self::new(channel))
    }
}

impl ReflectionChannel for GrpcReflectionChannel {
    async fn exchange(&mut self, query: ReflectionQuery) -> Result<Option<ReflectionReply>> {
        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(message_request(&query)),
        };

        let mut responses = self
            .client
            .server_reflection_info(tokio_stream::once(request))
            .await
            .map_err(|status| Error::rpc(query.to_string(), status))?
            .into_inner();

        let response = responses
            .message()
            .await
            .map_err(|status| Error::rpc(query.to_string(), status))?;

        match response {
            Some(response) => into_reply(&query, response),
            None => {
                trace!("stream closed without a response while {}", query);
                Ok(None)
            }
        }
    }
}

fn message_request(query: &ReflectionQuery) -> MessageRequest {
    match query {
        ReflectionQuery::ListServices => MessageRequest::ListServices(String::new()),
        ReflectionQuery::FileContainingSymbol(symbol) => {
            MessageRequest::FileContainingSymbol(symbol.clone())
        }
        ReflectionQuery::FileByFilename(name) => MessageRequest::FileByFilename(name.clone()),
    }
}

fn into_reply(
    query: &ReflectionQuery,
    response: ServerReflectionResponse,
) -> Result<Option<ReflectionReply>> {
    match response.message_response {
        None => {
            trace!("response without payload while {}", query);
            Ok(None)
        }
        Some(MessageResponse::ListServicesResponse(list)) => Ok(Some(ReflectionReply::Services(
            list.service.into_iter().map(|s| s.name).collect(),
        ))),
        Some(MessageResponse::FileDescriptorResponse(files)) => Ok(Some(
            ReflectionReply::FileDescriptors(files.file_descriptor_proto),
        )),
        Some(MessageResponse::ErrorResponse(err)) => Err(Error::server_error(
            query.to_string(),
            err.error_code,
            err.error_message,
        )),
        Some(MessageResponse::AllExtensionNumbersResponse(_)) => Err(Error::unexpected_response(
            query.to_string(),
            "got an extension number listing",
        )),
    }
}
