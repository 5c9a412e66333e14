use log::error;

use crate::db::models::{Profile, SyncMetadata};
use crate::db::postgres::PostgresClient;
use crate::utils::sanitize_string;

const PROFILE_COLUMNS: &str = r#"
    ens_name, resolver_address, registrant_address, token_id, expiration_date,
    content_hash, bitcoin, dogecoin, email, url, avatar, location,
    description, notice, keywords, discord, github, reddit, twitter,
    telegram, linkedin, ens_delegate, emitted_block_number
"#;

/// Free-text record values come straight from resolver contracts; strip
/// null bytes before they reach a text column.
fn sanitize_profile(profile: &Profile) -> Profile {
    let clean = |field: &Option<String>| field.as_deref().map(sanitize_string);

    Profile {
        email: clean(&profile.email),
        avatar: clean(&profile.avatar),
        location: clean(&profile.location),
        description: clean(&profile.description),
        notice: clean(&profile.notice),
        keywords: profile
            .keywords
            .as_ref()
            .map(|words| words.iter().map(|w| sanitize_string(w)).collect()),
        discord: clean(&profile.discord),
        github: clean(&profile.github),
        reddit: clean(&profile.reddit),
        twitter: clean(&profile.twitter),
        telegram: clean(&profile.telegram),
        linkedin: clean(&profile.linkedin),
        ens_delegate: clean(&profile.ens_delegate),
        ..profile.clone()
    }
}

impl PostgresClient {
    // ==================== PROFILES ====================

    /// Plain batch insert, for full backfills into an empty table
    /// (multi-row VALUES).
    pub async fn insert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()> {
        self.write_profiles(profiles, false).await
    }

    /// Batch insert/update keyed on `ens_name`, for incremental runs
    /// (multi-row VALUES with ON CONFLICT).
    pub async fn upsert_profiles(&self, profiles: &[Profile]) -> anyhow::Result<()> {
        self.write_profiles(profiles, true).await
    }

    async fn write_profiles(&self, profiles: &[Profile], upsert: bool) -> anyhow::Result<()> {
        if profiles.is_empty() {
            return Ok(());
        }

        const COLS_PER_ROW: usize = 23;
        const BATCH_SIZE: usize = 300; // Smaller batches due to large number of columns

        let client = self.pool.get().await?;

        for chunk in profiles.chunks(BATCH_SIZE) {
            // Build VALUES placeholders: ($1,$2,...,$23), ($24,...,$46), ...
            let values_clauses: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    let start = i * COLS_PER_ROW + 1;
                    let placeholders: Vec<String> = (start..start + COLS_PER_ROW)
                        .map(|n| format!("${}", n))
                        .collect();
                    format!("({})", placeholders.join(", "))
                })
                .collect();

            let conflict_clause = if upsert {
                r#"
                ON CONFLICT (ens_name) DO UPDATE SET
                    resolver_address = EXCLUDED.resolver_address,
                    registrant_address = EXCLUDED.registrant_address,
                    token_id = EXCLUDED.token_id,
                    expiration_date = EXCLUDED.expiration_date,
                    content_hash = EXCLUDED.content_hash,
                    bitcoin = EXCLUDED.bitcoin,
                    dogecoin = EXCLUDED.dogecoin,
                    email = EXCLUDED.email,
                    url = EXCLUDED.url,
                    avatar = EXCLUDED.avatar,
                    location = EXCLUDED.location,
                    description = EXCLUDED.description,
                    notice = EXCLUDED.notice,
                    keywords = EXCLUDED.keywords,
                    discord = EXCLUDED.discord,
                    github = EXCLUDED.github,
                    reddit = EXCLUDED.reddit,
                    twitter = EXCLUDED.twitter,
                    telegram = EXCLUDED.telegram,
                    linkedin = EXCLUDED.linkedin,
                    ens_delegate = EXCLUDED.ens_delegate,
                    emitted_block_number = EXCLUDED.emitted_block_number
                "#
            } else {
                ""
            };

            let query = format!(
                "INSERT INTO enscan.profiles ({}) VALUES {}{}",
                PROFILE_COLUMNS,
                values_clauses.join(", "),
                conflict_clause
            );

            // Sanitized copies must outlive the params array
            let sanitized: Vec<Profile> = chunk.iter().map(sanitize_profile).collect();

            let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
                Vec::with_capacity(chunk.len() * COLS_PER_ROW);

            for profile in &sanitized {
                params.push(&profile.ens_name);
                params.push(&profile.resolver_address);
                params.push(&profile.registrant_address);
                params.push(&profile.token_id);
                params.push(&profile.expiration_date);
                params.push(&profile.content_hash);
                params.push(&profile.bitcoin);
                params.push(&profile.dogecoin);
                params.push(&profile.email);
                params.push(&profile.url);
                params.push(&profile.avatar);
                params.push(&profile.location);
                params.push(&profile.description);
                params.push(&profile.notice);
                params.push(&profile.keywords);
                params.push(&profile.discord);
                params.push(&profile.github);
                params.push(&profile.reddit);
                params.push(&profile.twitter);
                params.push(&profile.telegram);
                params.push(&profile.linkedin);
                params.push(&profile.ens_delegate);
                params.push(&profile.emitted_block_number);
            }

            client.execute(&query, &params).await.map_err(|e| {
                error!("Failed to batch write {} profiles: {:?}", chunk.len(), e);
                e
            })?;
        }

        Ok(())
    }

    // ==================== SYNC METADATA ====================

    /// Append one run record. The table is append-only; rows are never
    /// updated or deleted.
    pub async fn insert_sync_metadata(&self, metadata: &SyncMetadata) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO enscan.indexing_metadata (last_block_number, fails, created_at)
            VALUES ($1, $2, $3)
        "#;

        client
            .execute(
                query,
                &[
                    &metadata.last_block_number,
                    &metadata.fails,
                    &metadata.created_at,
                ],
            )
            .await
            .map_err(|e| {
                error!(
                    "Failed to insert sync metadata for block {}: {:?}",
                    metadata.last_block_number, e
                );
                e
            })?;

        Ok(())
    }

    /// Most recent run record, if any run has completed.
    pub async fn last_sync_metadata(&self) -> anyhow::Result<Option<SyncMetadata>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT last_block_number, fails, created_at
            FROM enscan.indexing_metadata
            ORDER BY id DESC
            LIMIT 1
        "#;

        let row = client.query_opt(query, &[]).await?;

        Ok(row.map(|row| SyncMetadata {
            last_block_number: row.get("last_block_number"),
            fails: row.get("fails"),
            created_at: row.get("created_at"),
        }))
    }
}
