mod audit_event;
mod payment_status;
mod reservation;
mod settings;
mod tax_bracket;

pub use audit_event::AuditEvent;
pub use payment_status::PaymentStatus;
pub use reservation::{NewReservation, Reservation, ReservationFilter};
pub use settings::{Settings, keys as setting_keys};
pub use tax_bracket::TaxBracket;
