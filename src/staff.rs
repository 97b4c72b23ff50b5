//! Staff administration calls. Everything goes through the Authenticated Request
//! Client; screens and form validation belong to the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::AuthenticatedClient;
use crate::error::ClientResult;
use crate::identity::Role;
use crate::transport::ApiRequest;

pub const STAFF_PATH: &str = "/auth/staff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    pub restaurant_id: i64,
    pub is_active: bool,
    pub can_login: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaff {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_login: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaffFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl StaffFilter {
    fn apply(&self, mut req: ApiRequest) -> ApiRequest {
        if let Some(role) = self.role { req = req.with_query("role", role.as_str()); }
        if let Some(active) = self.is_active { req = req.with_query("isActive", active.to_string()); }
        req
    }
}

#[derive(Clone)]
pub struct StaffService {
    client: AuthenticatedClient,
}

impl StaffService {
    pub fn new(client: AuthenticatedClient) -> Self { Self { client } }

    pub async fn list(&self, filter: StaffFilter) -> ClientResult<Vec<Staff>> {
        let req = filter.apply(ApiRequest::get(STAFF_PATH));
        let staff: Vec<Staff> = self.client.get_json(req).await?;
        debug!(target: "staff", "listed {} staff member(s)", staff.len());
        Ok(staff)
    }

    pub async fn get(&self, id: i64) -> ClientResult<Staff> {
        self.client.get_json(ApiRequest::get(format!("{}/{}", STAFF_PATH, id))).await
    }

    pub async fn create(&self, data: &CreateStaff) -> ClientResult<Staff> {
        let staff: Staff = self.client.post_json(STAFF_PATH, data).await?;
        debug!(target: "staff", "created staff id={} role={}", staff.id, staff.role);
        Ok(staff)
    }

    pub async fn update_status(&self, id: i64, data: &UpdateStaffStatus) -> ClientResult<Staff> {
        self.client.patch_json(&format!("{}/{}/status", STAFF_PATH, id), data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_builds_query_in_wire_names() {
        let f = StaffFilter { role: Some(Role::Chef), is_active: Some(false) };
        assert_eq!(f.apply(ApiRequest::get(STAFF_PATH)).path_and_query(), "/auth/staff?role=CHEF&isActive=false");
        assert_eq!(StaffFilter::default().apply(ApiRequest::get(STAFF_PATH)).path_and_query(), "/auth/staff");
    }

    #[test]
    fn status_update_omits_unset_fields() {
        let body = serde_json::to_value(UpdateStaffStatus { is_active: None, can_login: Some(false) }).unwrap();
        assert_eq!(body, serde_json::json!({"canLogin": false}));
    }
}
