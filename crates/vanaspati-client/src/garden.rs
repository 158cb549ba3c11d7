//! Garden registry: thin wrappers over `/garden/plants`.
//!
//! Unlike [`crate::history::HistoryCache`], the registry keeps no local copy.
//! After a save, update or delete the caller calls [`GardenRegistry::list`]
//! again to see the result.

use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use vanaspati_core::logging::component;
use vanaspati_core::{
    ClientEvent, Error, GardenList, GardenPlant, NewGardenPlant, PlantUpdate, RecordId, Result,
};

use crate::gateway::ApiClient;

const PLANTS_PATH: &str = "/garden/plants";

#[derive(Debug, Clone)]
pub struct GardenRegistry {
    api: ApiClient,
}

impl GardenRegistry {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All tracked plants, as returned by the server.
    pub async fn list(&self) -> Result<Vec<GardenPlant>> {
        let list: GardenList = self
            .api
            .execute_json(Method::GET, PLANTS_PATH, |req| req)
            .await?;

        debug!(
            component = component::GARDEN,
            op = "list",
            result_count = list.plants.len(),
            "Garden listed"
        );
        Ok(list.plants)
    }

    /// Start tracking a plant. Returns the server's response body.
    pub async fn save(&self, plant: &NewGardenPlant) -> Result<JsonValue> {
        let query = plant.to_query();
        let created = self
            .api
            .execute_value(Method::POST, PLANTS_PATH, |req| req.query(&query))
            .await?;

        info!(
            component = component::GARDEN,
            op = "save",
            plant_name = %plant.plant_name,
            status = %plant.status,
            "Plant saved to garden"
        );
        self.api.events().emit(ClientEvent::GardenPlantSaved {
            plant_name: plant.plant_name.clone(),
        });
        Ok(created)
    }

    /// Change notes and/or status. Fields left `None` are not sent, so the
    /// server keeps their current values.
    pub async fn update(&self, id: &RecordId, update: &PlantUpdate) -> Result<JsonValue> {
        if update.is_empty() {
            return Err(Error::Validation(
                "Nothing to update: provide notes or status".to_string(),
            ));
        }

        let path = format!("{}/{}", PLANTS_PATH, id);
        let query = update.to_query();
        let updated = self
            .api
            .execute_value(Method::PATCH, &path, |req| req.query(&query))
            .await?;

        info!(
            component = component::GARDEN,
            op = "update",
            plant_id = %id,
            notes_changed = update.notes.is_some(),
            status = ?update.status,
            "Garden plant updated"
        );
        self.api.events().emit(ClientEvent::GardenPlantUpdated {
            plant_id: id.clone(),
            status: update.status,
        });
        Ok(updated)
    }

    /// Stop tracking a plant.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let path = format!("{}/{}", PLANTS_PATH, id);
        self.api.execute_value(Method::DELETE, &path, |req| req).await?;

        info!(
            component = component::GARDEN,
            op = "delete",
            plant_id = %id,
            "Garden plant removed"
        );
        self.api
            .events()
            .emit(ClientEvent::GardenPlantDeleted { plant_id: id.clone() });
        Ok(())
    }
}
