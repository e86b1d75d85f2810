//! Incident lifecycle engine.
//!
//! Owns incident creation, the status state machine with its append-only
//! history, and membership-based access control for private incidents.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::context::Identity;
use crate::models::history::StatusHistory;
use crate::models::incident::{Incident, IncidentStatus};
use crate::persistence::history_repo::HistoryRepo;
use crate::persistence::incident_repo::IncidentRepo;
use crate::slack::blocks;
use crate::state::AppState;
use crate::{AppError, Result};

/// Fields required to open a new incident.
#[derive(Debug, Clone)]
pub struct CreateIncident {
    /// Short human title.
    pub title: String,
    /// Longer free-text description.
    pub description: String,
    /// Category identifier (drives channel invites).
    pub category: String,
    /// Severity identifier.
    pub severity: String,
    /// Channel the triggering message was posted in.
    pub origin_channel_id: String,
    /// Name of the origin channel.
    pub origin_channel_name: String,
    /// Creator identity.
    pub created_by: String,
    /// Whether the incident is restricted to its member set.
    pub private: bool,
    /// Whether the incident starts in `Triage` rather than `Handling`.
    pub triage: bool,
}

/// Service owning incident state transitions and visibility rules.
#[derive(Clone)]
pub struct IncidentService {
    state: Arc<AppState>,
}

impl IncidentService {
    /// Create a new service instance.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn incidents(&self) -> IncidentRepo {
        IncidentRepo::new(Arc::clone(&self.state.db))
    }

    fn history(&self) -> HistoryRepo {
        HistoryRepo::new(Arc::clone(&self.state.db))
    }

    /// Open a new incident.
    ///
    /// Allocates a monotonic number, seeds the member set with the creator,
    /// picks the initial status from the triage flag, writes exactly one
    /// seed history entry, then orchestrates the dedicated channel
    /// (creation, invites, bookmark) best-effort.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty title and `AppError::Db`
    /// for persistence failures. Chat-platform failures during channel
    /// orchestration are logged and swallowed.
    pub async fn create(&self, request: CreateIncident) -> Result<Incident> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("incident title must not be empty".into()));
        }

        let number = self.incidents().next_incident_number().await?;
        let status = if request.triage {
            IncidentStatus::Triage
        } else {
            IncidentStatus::Handling
        };

        let mut incident = Incident {
            number,
            title: request.title.trim().to_owned(),
            description: request.description,
            category: request.category,
            severity: request.severity,
            origin_channel_id: request.origin_channel_id,
            origin_channel_name: request.origin_channel_name,
            incident_channel_id: None,
            incident_channel_name: None,
            created_by: request.created_by.clone(),
            private: request.private,
            members: vec![request.created_by],
            status,
            created_at: Utc::now(),
            lead: None,
        };

        self.incidents().put(&incident).await?;
        self.history()
            .append(&StatusHistory::new(
                number,
                status,
                incident.created_by.clone(),
                "incident opened",
            ))
            .await?;

        info!(number, status = status.as_str(), "incident created");

        if let Err(err) = self.orchestrate_channel(&mut incident).await {
            warn!(number, %err, "incident channel orchestration incomplete");
        }

        Ok(incident)
    }

    /// Create the dedicated channel, invite the category lists, post the
    /// opening summary, and add the dashboard bookmark.
    async fn orchestrate_channel(&self, incident: &mut Incident) -> Result<()> {
        let Some(ref slack) = self.state.slack else {
            return Ok(());
        };

        let name = channel_name(
            &self.state.config.channel_prefix,
            incident.number,
            &incident.title,
        );
        let channel = slack.create_channel(&name, incident.private).await?;
        self.incidents()
            .set_incident_channel(incident.number, &channel.id, &channel.name)
            .await?;
        incident.incident_channel_id = Some(channel.id.clone());
        incident.incident_channel_name = Some(channel.name.clone());

        let category = self.state.config.category(&incident.category);
        let mut invitees = category.invite_users;
        invitees.push(incident.created_by.clone());
        for group in &category.invite_groups {
            match slack.usergroup_members(group).await {
                Ok(members) => invitees.extend(members),
                Err(err) => warn!(group, %err, "failed to expand usergroup"),
            }
        }
        invitees.sort();
        invitees.dedup();
        if let Err(err) = slack.invite_users(&channel.id, &invitees).await {
            warn!(channel = %channel.id, %err, "failed to invite members");
        }

        let summary = blocks::incident_opened(incident);
        if let Err(err) = slack
            .post_message(
                &channel.id,
                &format!("Incident #{} opened", incident.number),
                Some(serde_json::Value::Array(summary)),
                None,
            )
            .await
        {
            warn!(channel = %channel.id, %err, "failed to post opening summary");
        }

        if let Some(ref frontend_url) = self.state.config.frontend_url {
            let link = format!(
                "{}/incidents/{}",
                frontend_url.trim_end_matches('/'),
                incident.number
            );
            if let Err(err) = slack.add_bookmark(&channel.id, "Dashboard", &link).await {
                warn!(channel = %channel.id, %err, "failed to add dashboard bookmark");
            }
        }

        Ok(())
    }

    /// Transition an incident to a new status.
    ///
    /// Any defined status is reachable from any other; ordering discipline
    /// is a caller policy. The incident row is mutated first, then exactly
    /// one history row is appended — the two writes are deliberately
    /// separate calls with no transaction around them (a crash in between
    /// leaves an accepted inconsistency window).
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a missing incident.
    pub async fn set_status(
        &self,
        number: i64,
        status: IncidentStatus,
        actor: &Identity,
        note: &str,
    ) -> Result<Incident> {
        let mut incident = self.incidents().get(number).await?;

        self.incidents().update_status(number, status).await?;
        incident.status = status;

        let actor_id = actor.user_id().unwrap_or("system").to_owned();
        self.history()
            .append(&StatusHistory::new(number, status, actor_id, note))
            .await?;

        info!(number, status = status.as_str(), "incident status changed");
        Ok(incident)
    }

    /// Transition with a caller-supplied status string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown status value, with no
    /// mutation and no history entry.
    pub async fn set_status_str(
        &self,
        number: i64,
        status: &str,
        actor: &Identity,
        note: &str,
    ) -> Result<Incident> {
        let status = IncidentStatus::parse(status)?;
        self.set_status(number, status, actor, note).await
    }

    /// Fetch an incident with visibility rules applied.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the incident does not exist.
    pub async fn get_for_viewer(&self, number: i64, viewer: &Identity) -> Result<Incident> {
        let incident = self.incidents().get(number).await?;
        Ok(filter_for_viewer(&incident, viewer))
    }

    /// List all incidents with visibility rules applied to each.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_viewer(&self, viewer: &Identity) -> Result<Vec<Incident>> {
        let incidents = self.incidents().list().await?;
        Ok(incidents
            .iter()
            .map(|incident| filter_for_viewer(incident, viewer))
            .collect())
    }

    /// History entries for one incident, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn status_history(&self, number: i64) -> Result<Vec<StatusHistory>> {
        self.history().list_by_incident(number).await
    }
}

/// Apply the private-incident visibility rule for one viewer.
///
/// Non-private incidents and viewers with no auth context (service-to-
/// service callers) see the incident unmodified. A non-member viewing a
/// private incident gets a redacted copy; members and the creator see
/// everything.
#[must_use]
pub fn filter_for_viewer(incident: &Incident, viewer: &Identity) -> Incident {
    if !incident.private {
        return incident.clone();
    }
    match viewer.user_id() {
        None => incident.clone(),
        Some(user_id) if incident.is_member(user_id) => incident.clone(),
        Some(_) => incident.redacted(),
    }
}

/// Derive the dedicated channel name: `<prefix>-<number>-<slug>`.
#[must_use]
pub fn channel_name(prefix: &str, number: i64, title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug: String = slug.chars().take(30).collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("{prefix}-{number}")
    } else {
        format!("{prefix}-{number}-{slug}")
    }
}
