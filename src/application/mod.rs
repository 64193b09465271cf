// Application layer - Chart lifecycle use cases and the ports they depend on
pub mod chart_controller;
pub mod chart_data_client;
pub mod collaborators;
pub mod dashboard_controller;
pub mod filter_dialog;
pub mod source_registry;
#[cfg(test)]
pub mod testing;
