pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod forward;
pub mod gate;
pub mod lookup;
pub mod predicate;
pub mod roles;

pub use claims::{PrincipalClaims, UserClaims};
pub use config::JwtConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::AuthContext;
pub use forward::{ForwardMap, ForwardMapError, ForwardedClaims};
pub use gate::{ClaimsGate, ClaimsGateBuilder, ClaimsValidator};
pub use lookup::{TokenLookup, TokenLookupError};
pub use predicate::{Predicate, PredicateError};
pub use roles::{
    ADMIN_PERMISSIONS, BASELINE_PERMISSIONS, PERMISSION_CREATE, PERMISSION_DELETE,
    PERMISSION_READ, PERMISSION_UPDATE, ROLE_ADMIN,
};
