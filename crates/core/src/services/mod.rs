pub mod analytics_service;
pub mod chart_service;
pub mod comparison_service;
pub mod currency_service;
pub mod market_data_service;
pub mod pnl_service;
pub mod portfolio_service;
