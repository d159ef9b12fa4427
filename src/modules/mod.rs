pub mod auth;
pub mod books;

use libris_kernel::{settings::Settings, ModuleRegistry};

use crate::Services;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, services: &Services, settings: &Settings) {
    registry.register_custom(books::create_module(
        services.books.clone(),
        services.sessions.clone(),
    ));
    registry.register_custom(auth::create_module(
        services.sessions.clone(),
        services.identity.clone(),
        &settings.auth,
    ));
}
