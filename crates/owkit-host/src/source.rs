//! Host source traits
//!
//! Each trait covers one host event surface. Requests are async and resolve
//! with the host's reply; pushes are exposed as [`SingleEvent`]s that the
//! trackers attach to while they run.

use owkit_core::SingleEvent;

use crate::types::{
    ActivePlans, CurrentUser, GameInfoUpdatedEvent, GetInfoResult, InfoUpdate, LauncherInfo,
    LauncherUpdatedEvent, LoginStateChangedEvent, NewEvents, RunningGameInfo,
    RunningLaunchersInfo, SetRequiredFeaturesResult, SubscriptionChangedEvent, TelemetryError,
};

/// Game or launcher telemetry source
#[trait_variant::make(TelemetrySource: Send)]
pub trait LocalTelemetrySource {
    /// Ask the host to enable `features`
    async fn set_required_features(&self, features: &[String]) -> SetRequiredFeaturesResult;

    /// Pull the full current snapshot
    async fn get_info(&self) -> GetInfoResult;

    fn on_error(&self) -> &SingleEvent<TelemetryError>;

    fn on_info_update(&self) -> &SingleEvent<InfoUpdate>;

    fn on_new_events(&self) -> &SingleEvent<NewEvents>;
}

/// Running game status source
#[trait_variant::make(GameStatusSource: Send)]
pub trait LocalGameStatusSource {
    /// Current running game, `None` when no game is running
    async fn get_running_game_info(&self) -> Option<RunningGameInfo>;

    fn on_game_info_updated(&self) -> &SingleEvent<GameInfoUpdatedEvent>;
}

/// Running launcher status source
#[trait_variant::make(LauncherStatusSource: Send)]
pub trait LocalLauncherStatusSource {
    async fn get_running_launchers_info(&self) -> RunningLaunchersInfo;

    fn on_launched(&self) -> &SingleEvent<LauncherInfo>;

    fn on_terminated(&self) -> &SingleEvent<LauncherInfo>;

    fn on_updated(&self) -> &SingleEvent<LauncherUpdatedEvent>;
}

/// Signed-in user and subscription source
#[trait_variant::make(ProfileSource: Send)]
pub trait LocalProfileSource {
    async fn get_current_user(&self) -> CurrentUser;

    async fn get_active_plans(&self) -> ActivePlans;

    fn on_login_state_changed(&self) -> &SingleEvent<LoginStateChangedEvent>;

    fn on_subscription_changed(&self) -> &SingleEvent<SubscriptionChangedEvent>;
}
