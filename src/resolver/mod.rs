//! Per-event profile resolution against the ENS contracts.
//!
//! Given one decoded registration event, the resolver looks up the name's
//! resolver contract, reads every known record field concurrently and
//! assembles a validated [`Profile`]. Failures abort only that one name's
//! resolution; the orchestrator catches and records them.

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::DynProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use crate::abis::{
    IAddrResolver, IBaseRegistrar, IContentHashResolver, IENSRegistry, IMulticoinResolver,
    ITextResolver, BASE_REGISTRAR, ENS_REGISTRY,
};
use crate::db::models::{Profile, RegistrationEvent};
use crate::error::ResolveError;
use crate::utils::{namehash, non_empty, normalize_url, split_keywords, token_id};

/// SLIP-44 coin type for Bitcoin.
const COIN_TYPE_BTC: u64 = 0;
/// SLIP-44 coin type for Dogecoin.
const COIN_TYPE_DOGE: u64 = 3;

/// Resolves one registration event into a full profile.
///
/// Faked in tests; implemented against mainnet by [`EnsProfileResolver`].
#[async_trait]
pub trait ResolveProfile: Send + Sync {
    async fn resolve(&self, event: &RegistrationEvent) -> Result<Profile, ResolveError>;
}

/// `ResolveProfile` against the ENS registry, base registrar and the
/// name's own resolver contract, over a shared alloy provider.
pub struct EnsProfileResolver {
    provider: DynProvider,
    registry: Address,
    registrar: Address,
}

impl EnsProfileResolver {
    pub fn new(provider: DynProvider) -> Result<Self> {
        Ok(Self {
            provider,
            registry: ENS_REGISTRY.parse().context("Invalid registry address")?,
            registrar: BASE_REGISTRAR.parse().context("Invalid registrar address")?,
        })
    }

    /// Resolver contract for a name, via the registry. The zero address
    /// means the name has no servable profile.
    async fn resolver_address(&self, node: alloy::primitives::B256) -> Result<Address> {
        let registry = IENSRegistry::new(self.registry, &self.provider);
        registry
            .resolver(node)
            .call()
            .await
            .context("registry resolver lookup failed")
    }

    async fn expiration_date(&self, id: U256) -> Result<DateTime<Utc>> {
        let registrar = IBaseRegistrar::new(self.registrar, &self.provider);
        let expiry = registrar
            .nameExpires(id)
            .call()
            .await
            .context("registrar nameExpires call failed")?;

        let seconds = i64::try_from(expiry).map_err(|_| {
            anyhow::anyhow!("expiry {expiry} does not fit a unix timestamp")
        })?;
        DateTime::<Utc>::from_timestamp(seconds, 0)
            .with_context(|| format!("expiry {seconds} is out of timestamp range"))
    }
}

#[async_trait]
impl ResolveProfile for EnsProfileResolver {
    async fn resolve(&self, event: &RegistrationEvent) -> Result<Profile, ResolveError> {
        let name = event.name.clone();
        let node = namehash(&name);

        let resolver_addr = self.resolver_address(node).await?;
        if resolver_addr == Address::ZERO {
            // Name may be unregistered, or the resolver was never set.
            return Err(ResolveError::NotFound(name));
        }

        let token_hash = token_id(&name);
        let expiration_date = self
            .expiration_date(U256::from_be_bytes(token_hash.0))
            .await?;

        debug!("Resolving records for {name}");

        let addr_resolver = IAddrResolver::new(resolver_addr, &self.provider);
        let coin_resolver = IMulticoinResolver::new(resolver_addr, &self.provider);
        let text_resolver = ITextResolver::new(resolver_addr, &self.provider);
        let hash_resolver = IContentHashResolver::new(resolver_addr, &self.provider);

        // Each call future borrows its builder, so the builders must
        // outlive the join.
        let registrant_call = addr_resolver.addr(node);
        let content_hash_call = hash_resolver.contenthash(node);
        let bitcoin_call = coin_resolver.addr(node, U256::from(COIN_TYPE_BTC));
        let dogecoin_call = coin_resolver.addr(node, U256::from(COIN_TYPE_DOGE));
        let email_call = text_resolver.text(node, "email".to_string());
        let url_call = text_resolver.text(node, "url".to_string());
        let avatar_call = text_resolver.text(node, "avatar".to_string());
        let location_call = text_resolver.text(node, "location".to_string());
        let description_call = text_resolver.text(node, "description".to_string());
        let notice_call = text_resolver.text(node, "notice".to_string());
        let keywords_call = text_resolver.text(node, "keywords".to_string());
        let discord_call = text_resolver.text(node, "com.discord".to_string());
        let github_call = text_resolver.text(node, "com.github".to_string());
        let reddit_call = text_resolver.text(node, "com.reddit".to_string());
        let twitter_call = text_resolver.text(node, "com.twitter".to_string());
        let telegram_call = text_resolver.text(node, "org.telegram".to_string());
        let linkedin_call = text_resolver.text(node, "com.linkedin".to_string());
        let ens_delegate_call = text_resolver.text(node, "eth.ens.delegate".to_string());

        // Record reads are independent; issue them all at once.
        let (
            registrant,
            content_hash,
            bitcoin,
            dogecoin,
            email,
            url,
            avatar,
            location,
            description,
            notice,
            keywords,
            discord,
            github,
            reddit,
            twitter,
            telegram,
            linkedin,
            ens_delegate,
        ) = tokio::join!(
            registrant_call.call(),
            content_hash_call.call(),
            bitcoin_call.call(),
            dogecoin_call.call(),
            email_call.call(),
            url_call.call(),
            avatar_call.call(),
            location_call.call(),
            description_call.call(),
            notice_call.call(),
            keywords_call.call(),
            discord_call.call(),
            github_call.call(),
            reddit_call.call(),
            twitter_call.call(),
            telegram_call.call(),
            linkedin_call.call(),
            ens_delegate_call.call(),
        );

        let registrant = registrant.context("addr record read failed")?;
        let url = url.context("url record read failed")?;

        let profile = Profile {
            ens_name: name.clone(),
            resolver_address: format!("{resolver_addr:#x}"),
            registrant_address: format!("{registrant:#x}"),
            token_id: token_hash.to_string(),
            expiration_date,
            content_hash: bytes_record(content_hash.context("contenthash read failed")?),
            bitcoin: bytes_record(bitcoin.context("bitcoin addr read failed")?),
            dogecoin: bytes_record(dogecoin.context("dogecoin addr read failed")?),
            email: text_record(email)?,
            url: normalize_url(&url),
            avatar: text_record(avatar)?,
            location: text_record(location)?,
            description: text_record(description)?,
            notice: text_record(notice)?,
            keywords: split_keywords(&keywords.context("keywords record read failed")?),
            discord: text_record(discord)?,
            github: text_record(github)?,
            reddit: text_record(reddit)?,
            twitter: text_record(twitter)?,
            telegram: text_record(telegram)?,
            linkedin: text_record(linkedin)?,
            ens_delegate: text_record(ens_delegate)?,
            emitted_block_number: event.block_number as i64,
        };

        profile.validate().map_err(|reason| ResolveError::Validation {
            name: name.clone(),
            reason,
        })?;

        debug!("Resolved {name} -> {}", profile.registrant_address);
        Ok(profile)
    }
}

/// Unset text records come back as empty strings; store them as null.
fn text_record(
    read: Result<String, alloy::contract::Error>,
) -> Result<Option<String>, ResolveError> {
    let value = read.context("text record read failed")?;
    Ok(non_empty(value))
}

/// Binary records (contenthash, multicoin addresses) are kept as their raw
/// payload, hex encoded; empty payloads are stored as null.
fn bytes_record(bytes: Bytes) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(bytes.to_string())
    }
}
