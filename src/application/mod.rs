// Application layer - Ports and session use cases
pub mod metric_tab_mutations;
pub mod metrics_table_service;
pub mod metrics_tabs_client;
pub mod metrics_tabs_controller;
pub mod overlays;
