//! Configuration module

mod site;

pub use site::ApiConfig;
pub use site::GenerationConfig;
pub use site::MgsConfig;
pub use site::OnConflict;
pub use site::SafetySetting;
pub use site::SiteConfig;
