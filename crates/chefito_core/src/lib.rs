pub mod clock;
pub mod domain;
pub mod ports;
pub mod quota;

pub use clock::{current_week, current_year, Clock, FixedClock, SystemClock, WeekStamp};
pub use domain::{
    AuthenticatedUser, Identity, Profile, ProfileUpdate, QuotaStatus, RecipeView, Viewer,
};
pub use ports::{IdentityProvider, PortError, PortResult, ProfileStore, RecipeCatalog, ViewLedger};
pub use quota::{QuotaLimits, QuotaTracker};
