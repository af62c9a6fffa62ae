/// Permission grant storage
use crate::error::{BroadcasterError, BroadcasterResult};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Grant levels, ordered; a higher level can do everything a lower one can
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantLevel {
    /// Can sign content for publication
    Publish,
    /// Can manage feeds and lists
    Curate,
    /// Full control, including broadcaster maintenance
    Admin,
}

impl GrantLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantLevel::Publish => "publish",
            GrantLevel::Curate => "curate",
            GrantLevel::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> BroadcasterResult<Self> {
        match s.to_lowercase().as_str() {
            "publish" => Ok(GrantLevel::Publish),
            "curate" => Ok(GrantLevel::Curate),
            "admin" => Ok(GrantLevel::Admin),
            _ => Err(BroadcasterError::Validation(format!(
                "Invalid grant level: {}",
                s
            ))),
        }
    }

    /// Integer form used in grant rows
    pub fn as_stored(&self) -> i64 {
        match self {
            GrantLevel::Publish => 1,
            GrantLevel::Curate => 2,
            GrantLevel::Admin => 3,
        }
    }

    pub fn from_stored(value: i64) -> BroadcasterResult<Self> {
        match value {
            1 => Ok(GrantLevel::Publish),
            2 => Ok(GrantLevel::Curate),
            3 => Ok(GrantLevel::Admin),
            _ => Err(BroadcasterError::Internal(format!(
                "Invalid stored grant level: {}",
                value
            ))),
        }
    }

    /// Capitalized form used in grant listings
    pub fn display_name(&self) -> &'static str {
        match self {
            GrantLevel::Publish => "Publish",
            GrantLevel::Curate => "Curate",
            GrantLevel::Admin => "Admin",
        }
    }

    /// Check if this level covers actions requiring another level
    pub fn can_act_as(&self, required: GrantLevel) -> bool {
        self >= &required
    }
}

/// What kind of resource an aggregation names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Feed,
    List,
}

impl AggregationKind {
    pub fn as_stored(&self) -> i64 {
        match self {
            AggregationKind::Feed => 1,
            AggregationKind::List => 2,
        }
    }

    pub fn from_stored(value: i64) -> BroadcasterResult<Self> {
        match value {
            1 => Ok(AggregationKind::Feed),
            2 => Ok(AggregationKind::List),
            _ => Err(BroadcasterError::Internal(format!(
                "Invalid stored aggregation kind: {}",
                value
            ))),
        }
    }
}

/// A named feed or list registered with the broadcaster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    pub id: i64,
    pub kind: AggregationKind,
    pub name: String,
}

/// One stored permission grant.
///
/// A grant with no `aggregation_id` is the DID's base grant; pairings
/// scope the same DID to a single aggregation. A set `kid` pins the grant
/// to one signing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub aggregation_id: Option<i64>,
    pub network: Option<bool>,
    pub publisher: Option<String>,
    pub level: GrantLevel,
    pub did: String,
    pub kid: Option<String>,
}

impl Grant {
    /// Whether the grant extends across the whole network rather than
    /// single aggregations
    pub fn has_network_access(&self) -> bool {
        self.network == Some(true)
    }
}

/// A grant joined with the name of the aggregation it is scoped to,
/// as shown in grant listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantListing {
    pub aggregation: Option<String>,
    pub network: Option<bool>,
    pub publisher: Option<String>,
    #[serde(rename = "type")]
    pub level: String,
    pub did: String,
    pub kid: Option<String>,
}

/// Grant store backed by the broadcaster database
#[derive(Clone)]
pub struct GrantStore {
    db: SqlitePool,
}

impl GrantStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// The base grant stored for a DID (oldest row wins)
    pub async fn find_by_did(&self, did: &str) -> BroadcasterResult<Option<Grant>> {
        let row = sqlx::query(
            r#"
            SELECT id, aggregation_id, network, publisher, level, did, kid
            FROM permissions
            WHERE did = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(did)
        .fetch_optional(&self.db)
        .await?;

        row.map(|r| grant_from_row(&r)).transpose()
    }

    /// The grant pairing a DID with a specific aggregation
    pub async fn find_pairing(
        &self,
        did: &str,
        aggregation_id: i64,
    ) -> BroadcasterResult<Option<Grant>> {
        let row = sqlx::query(
            r#"
            SELECT id, aggregation_id, network, publisher, level, did, kid
            FROM permissions
            WHERE did = ? AND aggregation_id = ?
            LIMIT 1
            "#,
        )
        .bind(did)
        .bind(aggregation_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(|r| grant_from_row(&r)).transpose()
    }

    /// Every grant stored for a DID, joined with aggregation names
    pub async fn list_for_did(&self, did: &str) -> BroadcasterResult<Vec<GrantListing>> {
        let rows = sqlx::query(
            r#"
            SELECT p.network, p.publisher, p.level, p.did, p.kid, a.name AS aggregation
            FROM permissions p
            LEFT JOIN aggregations a ON a.id = p.aggregation_id
            WHERE p.did = ?
            ORDER BY p.id
            "#,
        )
        .bind(did)
        .fetch_all(&self.db)
        .await?;

        let mut listings = Vec::new();
        for row in rows {
            let level = GrantLevel::from_stored(row.get("level"))?;
            listings.push(GrantListing {
                aggregation: row.get("aggregation"),
                network: row.get("network"),
                publisher: row.get("publisher"),
                level: level.display_name().to_string(),
                did: row.get("did"),
                kid: row.get("kid"),
            });
        }

        Ok(listings)
    }

    /// Look up an aggregation by its unique name
    pub async fn find_aggregation(&self, name: &str) -> BroadcasterResult<Option<Aggregation>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, name
            FROM aggregations
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(Aggregation {
                id: row.get("id"),
                kind: AggregationKind::from_stored(row.get("kind"))?,
                name: row.get("name"),
            })),
            None => Ok(None),
        }
    }

    /// Ensure an aggregation named `name` exists, creating it with `kind`
    /// when absent. An existing record wins, whatever its kind.
    pub async fn ensure_aggregation(
        &self,
        name: &str,
        kind: AggregationKind,
    ) -> BroadcasterResult<Aggregation> {
        if let Some(existing) = self.find_aggregation(name).await? {
            return Ok(existing);
        }

        let result = sqlx::query("INSERT INTO aggregations (kind, name) VALUES (?, ?)")
            .bind(kind.as_stored())
            .bind(name)
            .execute(&self.db)
            .await?;

        Ok(Aggregation {
            id: result.last_insert_rowid(),
            kind,
            name: name.to_string(),
        })
    }

    /// Remove an aggregation; its grant pairings go with it (FK cascade)
    pub async fn delete_aggregation(&self, id: i64) -> BroadcasterResult<()> {
        sqlx::query("DELETE FROM aggregations WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Register a list: ensure its aggregation exists and, unless the actor
    /// holds network access, a pairing grant scoped to it. The pairing
    /// copies the base grant's network, publisher, and level for the acting
    /// DID and KID. Both writes land in one transaction.
    pub async fn register_list(
        &self,
        name: &str,
        base: &Grant,
        kid: &str,
    ) -> BroadcasterResult<Aggregation> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query("SELECT id, kind, name FROM aggregations WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

        let aggregation = match existing {
            Some(row) => Aggregation {
                id: row.get("id"),
                kind: AggregationKind::from_stored(row.get("kind"))?,
                name: row.get("name"),
            },
            None => {
                let result = sqlx::query("INSERT INTO aggregations (kind, name) VALUES (?, ?)")
                    .bind(AggregationKind::List.as_stored())
                    .bind(name)
                    .execute(&mut *tx)
                    .await?;

                Aggregation {
                    id: result.last_insert_rowid(),
                    kind: AggregationKind::List,
                    name: name.to_string(),
                }
            }
        };

        if !base.has_network_access() {
            let paired: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM permissions WHERE did = ? AND aggregation_id = ?",
            )
            .bind(&base.did)
            .bind(aggregation.id)
            .fetch_optional(&mut *tx)
            .await?;

            if paired.is_none() {
                sqlx::query(
                    r#"
                    INSERT INTO permissions (aggregation_id, network, publisher, level, did, kid)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(aggregation.id)
                .bind(base.network)
                .bind(&base.publisher)
                .bind(base.level.as_stored())
                .bind(&base.did)
                .bind(kid)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(aggregation)
    }
}

fn grant_from_row(row: &SqliteRow) -> BroadcasterResult<Grant> {
    Ok(Grant {
        id: row.get("id"),
        aggregation_id: row.get("aggregation_id"),
        network: row.get("network"),
        publisher: row.get("publisher"),
        level: GrantLevel::from_stored(row.get("level"))?,
        did: row.get("did"),
        kid: row.get("kid"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn test_grant_db() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE aggregations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind INTEGER NOT NULL,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                aggregation_id INTEGER REFERENCES aggregations(id) ON DELETE CASCADE,
                network INTEGER,
                publisher TEXT,
                level INTEGER NOT NULL,
                did TEXT NOT NULL,
                kid TEXT
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    pub(crate) async fn seed_grant(
        db: &SqlitePool,
        did: &str,
        level: GrantLevel,
        network: Option<bool>,
        kid: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO permissions (network, publisher, level, did, kid) VALUES (?, NULL, ?, ?, ?)",
        )
        .bind(network)
        .bind(level.as_stored())
        .bind(did)
        .bind(kid)
        .execute(db)
        .await
        .unwrap();
    }

    #[test]
    fn test_grant_level_hierarchy() {
        assert!(GrantLevel::Admin > GrantLevel::Curate);
        assert!(GrantLevel::Curate > GrantLevel::Publish);

        assert!(GrantLevel::Admin.can_act_as(GrantLevel::Curate));
        assert!(GrantLevel::Admin.can_act_as(GrantLevel::Publish));
        assert!(GrantLevel::Curate.can_act_as(GrantLevel::Curate));

        assert!(!GrantLevel::Publish.can_act_as(GrantLevel::Curate));
        assert!(!GrantLevel::Curate.can_act_as(GrantLevel::Admin));
    }

    #[test]
    fn test_grant_level_stored_form() {
        assert_eq!(GrantLevel::Publish.as_stored(), 1);
        assert_eq!(GrantLevel::Curate.as_stored(), 2);
        assert_eq!(GrantLevel::Admin.as_stored(), 3);

        assert_eq!(GrantLevel::from_stored(2).unwrap(), GrantLevel::Curate);
        assert!(GrantLevel::from_stored(9).is_err());

        assert_eq!(GrantLevel::from_str("ADMIN").unwrap(), GrantLevel::Admin);
        assert!(GrantLevel::from_str("owner").is_err());
    }

    #[tokio::test]
    async fn test_find_by_did() {
        let db = test_grant_db().await;
        seed_grant(
            &db,
            "did:psqr:example.com/u/alice",
            GrantLevel::Curate,
            Some(true),
            Some("did:psqr:example.com/u/alice#curate"),
        )
        .await;

        let store = GrantStore::new(db);

        let grant = store
            .find_by_did("did:psqr:example.com/u/alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.level, GrantLevel::Curate);
        assert!(grant.has_network_access());
        assert!(grant.aggregation_id.is_none());

        assert!(store
            .find_by_did("did:psqr:nowhere.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_register_list_creates_aggregation_and_pairing() {
        let db = test_grant_db().await;
        seed_grant(
            &db,
            "did:psqr:example.com/u/bob",
            GrantLevel::Curate,
            Some(false),
            None,
        )
        .await;

        let store = GrantStore::new(db);
        let base = store
            .find_by_did("did:psqr:example.com/u/bob")
            .await
            .unwrap()
            .unwrap();

        let aggregation = store
            .register_list("reading-list", &base, "did:psqr:example.com/u/bob#curate")
            .await
            .unwrap();
        assert_eq!(aggregation.kind, AggregationKind::List);

        let pairing = store
            .find_pairing("did:psqr:example.com/u/bob", aggregation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pairing.level, GrantLevel::Curate);
        assert_eq!(
            pairing.kid.as_deref(),
            Some("did:psqr:example.com/u/bob#curate")
        );

        // registering again must not duplicate the pairing
        let again = store
            .register_list("reading-list", &base, "did:psqr:example.com/u/bob#curate")
            .await
            .unwrap();
        assert_eq!(again.id, aggregation.id);

        let listings = store
            .list_for_did("did:psqr:example.com/u/bob")
            .await
            .unwrap();
        // base grant plus one pairing
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].aggregation.as_deref(), Some("reading-list"));
        assert_eq!(listings[1].level, "Curate");
    }

    #[tokio::test]
    async fn test_register_list_skips_pairing_for_network_grants() {
        let db = test_grant_db().await;
        seed_grant(
            &db,
            "did:psqr:example.com/u/carol",
            GrantLevel::Admin,
            Some(true),
            None,
        )
        .await;

        let store = GrantStore::new(db);
        let base = store
            .find_by_did("did:psqr:example.com/u/carol")
            .await
            .unwrap()
            .unwrap();

        let aggregation = store
            .register_list("network-list", &base, "did:psqr:example.com/u/carol#admin")
            .await
            .unwrap();

        assert!(store
            .find_pairing("did:psqr:example.com/u/carol", aggregation.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_ensure_aggregation_is_an_upsert() {
        let db = test_grant_db().await;
        let store = GrantStore::new(db);

        let created = store
            .ensure_aggregation("morning-news", AggregationKind::Feed)
            .await
            .unwrap();
        assert_eq!(created.kind, AggregationKind::Feed);

        // a second call returns the same record, even under another kind
        let again = store
            .ensure_aggregation("morning-news", AggregationKind::List)
            .await
            .unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.kind, AggregationKind::Feed);
    }

    #[tokio::test]
    async fn test_delete_aggregation_cascades_pairings() {
        let db = test_grant_db().await;
        seed_grant(
            &db,
            "did:psqr:example.com/u/dora",
            GrantLevel::Curate,
            Some(false),
            None,
        )
        .await;

        let store = GrantStore::new(db.clone());
        let base = store
            .find_by_did("did:psqr:example.com/u/dora")
            .await
            .unwrap()
            .unwrap();

        let aggregation = store
            .register_list("doomed-list", &base, "did:psqr:example.com/u/dora#curate")
            .await
            .unwrap();

        store.delete_aggregation(aggregation.id).await.unwrap();

        assert!(store
            .find_aggregation("doomed-list")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_pairing("did:psqr:example.com/u/dora", aggregation.id)
            .await
            .unwrap()
            .is_none());

        // the base grant survives the cascade
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
