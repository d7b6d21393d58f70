use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Service, ServiceCombo};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_days: Option<i32>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_days: Option<i32>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceList {
    pub items: Vec<Service>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateComboRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateComboRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComboList {
    pub items: Vec<ServiceCombo>,
}
