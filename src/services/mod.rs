pub mod mirror_service;
pub mod notifier;
pub mod portfolio;
pub mod result_recorder;

pub use mirror_service::MirrorService;
pub use notifier::TelegramNotifier;
pub use portfolio::PortfolioView;
pub use result_recorder::ResultRecorder;
