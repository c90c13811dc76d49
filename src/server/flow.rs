use std::sync::Arc;

use anyhow::anyhow;

use crate::{
    descriptor::{
        self, DecodedDescriptor, DescriptorError, HostTemplate, ParamsDescriptor, SuffixDescriptor,
        Variant,
    },
    error::{RedirectorError, RedirectorResult},
    server::AppState,
    transform::TransformError,
};

/// Where a request ends up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Derived image stored; permanent redirect to it.
    Derived(String),
    /// Temporary redirect to the original.
    Fallback(String),
    /// Nothing sensible to redirect to.
    Rejected,
}

/// Decode `descriptor`, derive the image and decide where to send the client.
///
/// Decoding failures fall back to whatever source key can be salvaged from the descriptor.
/// Failures after decoding fall back to the decoded source.
#[tracing::instrument(skip(state, variant), fields(%variant))]
pub async fn redirect_for(state: &AppState, variant: Variant, descriptor: &str) -> Outcome {
    let Some(hosts) = state.hosts(variant) else {
        tracing::warn!("grammar not served");
        return Outcome::Rejected;
    };

    match variant {
        Variant::Suffix => match SuffixDescriptor::decode(descriptor, hosts) {
            Ok(decoded) => derive(state, hosts, &decoded).await,
            Err(err) => rejected(descriptor, variant, hosts, &err),
        },
        Variant::Params => match ParamsDescriptor::decode(descriptor, hosts) {
            Ok(decoded) => derive(state, hosts, &decoded).await,
            Err(err) => rejected(descriptor, variant, hosts, &err),
        },
    }
}

fn rejected(
    descriptor: &str,
    variant: Variant,
    hosts: &HostTemplate,
    err: &DescriptorError,
) -> Outcome {
    let fallback = descriptor::fallback_uri(descriptor, variant, hosts);
    tracing::info!(error = %err, salvaged = fallback.is_some(), "descriptor rejected");
    fallback.map_or(Outcome::Rejected, Outcome::Fallback)
}

async fn derive<D>(state: &AppState, hosts: &HostTemplate, decoded: &D) -> Outcome
where
    D: DecodedDescriptor + Sync,
{
    match process(state, decoded).await {
        Ok(destination_key) => Outcome::Derived(hosts.build_uri(&destination_key)),
        Err(err) => {
            tracing::warn!(
                error = %err,
                source_key = decoded.source_key(),
                "derivation failed, redirecting to original"
            );
            Outcome::Fallback(decoded.fallback_uri().to_owned())
        }
    }
}

#[tracing::instrument(skip_all, fields(source_key = decoded.source_key()))]
async fn process<D>(state: &AppState, decoded: &D) -> RedirectorResult<String>
where
    D: DecodedDescriptor + Sync,
{
    let declared = decoded
        .identity()
        .format()
        .ok_or(TransformError::UnsupportedFormat)?;
    let source = state.store.fetch(decoded.source_key()).await?;

    let transform = Arc::clone(&state.transform);
    let params = *decoded.params();
    let image = tokio::task::spawn_blocking(move || transform.apply(&source, &params, declared))
        .await
        .map_err(|err| RedirectorError::Other(anyhow!("transform task failed: {err}")))??;

    let destination_key = decoded.destination_key(image.input, image.output);
    let content_type = decoded.content_type(image.output);
    state
        .store
        .store(&destination_key, image.bytes, content_type)
        .await?;

    tracing::info!(
        destination_key = %destination_key,
        content_type,
        input = ?image.input,
        output = ?image.output,
        "stored derived image"
    );
    Ok(destination_key)
}
