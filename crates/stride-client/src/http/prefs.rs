/*
[INPUT]:  User preference records
[OUTPUT]: Stored and retrieved preferences
[POS]:    HTTP layer - preferences endpoints
[UPDATE]: When preference fields change
*/

use reqwest::Method;

use crate::http::{ApiGateway, Result};
use crate::types::Preferences;

impl ApiGateway {
    /// GET /get-preferences
    pub async fn get_preferences(&self) -> Result<Preferences> {
        self.send(Method::GET, "/get-preferences", None).await
    }

    /// PUT /update-preferences
    pub async fn update_preferences(&self, preferences: &Preferences) -> Result<Preferences> {
        let body = serde_json::to_value(preferences)?;
        self.send(Method::PUT, "/update-preferences", Some(&body))
            .await
    }
}
