// Domain layer - Pure types and rules, no I/O
pub mod chart_rules;
pub mod chart_tab;
pub mod date_ranges;
pub mod metric;
pub mod permissions;
