//! Service request entity type - Citizen service requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Priority};
use crate::core::identity::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum RequestStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Resolved | RequestStatus::Closed)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Open => write!(f, "open"),
            RequestStatus::InProgress => write!(f, "in_progress"),
            RequestStatus::Resolved => write!(f, "resolved"),
            RequestStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(RequestStatus::Open),
            "in_progress" | "inprogress" => Ok(RequestStatus::InProgress),
            "resolved" => Ok(RequestStatus::Resolved),
            "closed" => Ok(RequestStatus::Closed),
            _ => Err(format!(
                "Invalid request status: {}. Use open, in_progress, resolved, or closed",
                s
            )),
        }
    }
}

/// Request raised by a citizen (pothole, streetlight, missed collection...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Unique identifier (SR-xxx)
    pub id: RecordId,

    /// Name of the citizen who raised it
    pub citizen: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    pub subject: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub request_status: RequestStatus,

    /// Note recorded when the request was resolved or closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author
    pub author: String,
}

impl Entity for ServiceRequest {
    const TYPE_NAME: &'static str = "service request";
    const DIRECTORY: &'static str = "requests";

    fn id_string(&self) -> String {
        self.id.to_string()
    }

    fn title(&self) -> &str {
        &self.subject
    }

    fn status(&self) -> String {
        self.request_status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl ServiceRequest {
    pub fn new(citizen: String, subject: String, author: String) -> Self {
        Self {
            id: RecordId::new(),
            citizen,
            contact: None,
            subject,
            description: None,
            category: None,
            priority: Priority::default(),
            request_status: RequestStatus::default(),
            resolution: None,
            created: Utc::now(),
            author,
        }
    }

    /// Move to a new status, recording a resolution note for terminal states
    pub fn transition(&mut self, status: RequestStatus, note: Option<String>) -> Result<(), String> {
        if self.request_status == RequestStatus::Closed && status != RequestStatus::Closed {
            return Err(format!("{} is closed and cannot be reopened", self.id));
        }
        self.request_status = status;
        if status.is_terminal() {
            if let Some(note) = note {
                self.resolution = Some(note);
            }
        }
        Ok(())
    }
}
