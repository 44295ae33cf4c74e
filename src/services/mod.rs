pub mod validation;
pub mod coin_service;
pub mod price_service;
