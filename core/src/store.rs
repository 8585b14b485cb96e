//! SQLite-backed campaign history.
//!
//! RULE: Only store.rs talks to the database.
//! The history is a bounded FIFO: every insert is followed by a trim to
//! `capacity`, oldest first. Reads come back newest first.

use crate::{
    error::{SimError, SimResult},
    genre::Genre,
    state::GameState,
    strategy::{
        AudienceTargeting, BiddingStrategy, CreativeFormat, MonetizationStrategy,
        RetentionStrategy,
    },
    types::{CampaignId, Dollars},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMetrics {
    pub genre: Option<Genre>,
    pub spend: Dollars,
    pub revenue: Dollars,
    pub roas: f64,
    pub cpi: Dollars,
    pub installs: u64,
    pub retention_d7: f64,
    pub arpdau: Dollars,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub audience: AudienceTargeting,
    pub creatives: Vec<CreativeFormat>,
    pub bidding: Option<BiddingStrategy>,
    pub retention: RetentionStrategy,
    pub monetization: MonetizationStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignHistoryEntry {
    pub id: CampaignId,
    pub timestamp: DateTime<Utc>,
    pub metrics: HistoryMetrics,
    pub strategy: StrategySnapshot,
}

impl CampaignHistoryEntry {
    /// Snapshot a finished session. `None` until every phase has committed.
    pub fn from_state(state: &GameState, timestamp: DateTime<Utc>) -> Option<Self> {
        let p1 = state.phase1_results?;
        let p2 = state.phase2_results?;
        let p3 = state.phase3_results?;
        let fin = state.final_results.as_ref()?;
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            metrics: HistoryMetrics {
                genre: state.app_genre,
                spend: fin.total_spend,
                revenue: fin.total_revenue,
                roas: fin.roas,
                cpi: p1.cpi,
                installs: p1.installs,
                retention_d7: p2.retention_rates.d7,
                arpdau: p3.arpdau,
            },
            strategy: StrategySnapshot {
                audience: state.audience_targeting.clone(),
                creatives: state.creative_selection.formats.clone(),
                bidding: state.bidding_strategy,
                retention: state.retention_strategy.clone(),
                monetization: state.monetization_strategy.clone(),
            },
        })
    }
}

/// Cross-campaign comparison, available once two campaigns exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub best_roas: f64,
    pub best_retention_d7: f64,
    /// Creative lists of up to two profitable campaigns, newest first.
    pub winning_creatives: Vec<Vec<CreativeFormat>>,
}

pub struct HistoryStore {
    conn: Connection,
    capacity: usize,
}

impl HistoryStore {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &str, capacity: usize) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn, capacity })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(capacity: usize) -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, capacity })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_campaign_history.sql"))?;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert, then evict the oldest entries beyond capacity.
    pub fn record(&self, entry: &CampaignHistoryEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO campaign_history (id, recorded_at, metrics_json, strategy_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id,
                entry.timestamp.to_rfc3339(),
                serde_json::to_string(&entry.metrics)?,
                serde_json::to_string(&entry.strategy)?,
            ],
        )?;
        let evicted = self.conn.execute(
            "DELETE FROM campaign_history WHERE seq NOT IN
             (SELECT seq FROM campaign_history ORDER BY seq DESC LIMIT ?1)",
            params![self.capacity as i64],
        )?;
        if evicted > 0 {
            log::debug!("history: evicted {evicted} oldest campaign(s)");
        }
        Ok(())
    }

    /// All retained campaigns, newest first.
    pub fn recent(&self) -> SimResult<Vec<CampaignHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recorded_at, metrics_json, strategy_json
             FROM campaign_history ORDER BY seq DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, recorded_at, metrics, strategy)| -> SimResult<CampaignHistoryEntry> {
                let timestamp = DateTime::parse_from_rfc3339(&recorded_at)
                    .map_err(|e| SimError::InvalidInput {
                        field: "recorded_at",
                        reason: e.to_string(),
                    })?
                    .with_timezone(&Utc);
                Ok(CampaignHistoryEntry {
                    id,
                    timestamp,
                    metrics: serde_json::from_str(&metrics)?,
                    strategy: serde_json::from_str(&strategy)?,
                })
            })
            .collect()
    }

    pub fn len(&self) -> SimResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM campaign_history", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> SimResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> SimResult<()> {
        self.conn.execute("DELETE FROM campaign_history", [])?;
        Ok(())
    }

    /// `None` with fewer than two campaigns on record.
    pub fn summary(&self) -> SimResult<Option<HistorySummary>> {
        Ok(summarize(&self.recent()?))
    }
}

/// Comparison over entries given newest first.
pub fn summarize(entries: &[CampaignHistoryEntry]) -> Option<HistorySummary> {
    if entries.len() < 2 {
        return None;
    }
    let best_roas = entries.iter().map(|e| e.metrics.roas).fold(f64::MIN, f64::max);
    let best_retention_d7 = entries
        .iter()
        .map(|e| e.metrics.retention_d7)
        .fold(f64::MIN, f64::max);
    let winning_creatives = entries
        .iter()
        .filter(|e| e.metrics.roas >= 1.0)
        .map(|e| e.strategy.creatives.clone())
        .take(2)
        .collect();
    Some(HistorySummary { best_roas, best_retention_d7, winning_creatives })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(roas: f64) -> CampaignHistoryEntry {
        CampaignHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            metrics: HistoryMetrics {
                genre: Some(Genre::CasualGame),
                spend: 1000.0,
                revenue: roas * 1000.0,
                roas,
                cpi: 1.1,
                installs: 50,
                retention_d7: 25.0,
                arpdau: 0.4,
            },
            strategy: StrategySnapshot {
                audience: AudienceTargeting::default(),
                creatives: vec![CreativeFormat::PlayableAds],
                bidding: Some(BiddingStrategy::Moderate),
                retention: RetentionStrategy::default(),
                monetization: MonetizationStrategy::default(),
            },
        }
    }

    #[test]
    fn record_and_read_back() {
        let store = HistoryStore::in_memory(5).unwrap();
        store.migrate().unwrap();
        let e = entry(1.2);
        store.record(&e).unwrap();
        let back = store.recent().unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, e.id);
        assert_eq!(back[0].metrics, e.metrics);
    }

    #[test]
    fn summary_needs_two_campaigns() {
        assert!(summarize(&[entry(1.0)]).is_none());
        let s = summarize(&[entry(0.5), entry(1.4)]).unwrap();
        assert_eq!(s.best_roas, 1.4);
        assert_eq!(s.winning_creatives.len(), 1);
    }
}
