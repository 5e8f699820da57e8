//! Domain rules for the clinic backend.
//!
//! Nothing in this crate performs I/O: the server crate loads rows, calls into
//! these functions, and persists what they return.

pub mod enums;
pub mod error;
pub mod finance;
pub mod lifecycle;
pub mod settlement;

pub use enums::{
    EstadoConsulta, EstadoPago, EstadoRemision, MetodoPago, Moneda, OrigenHistorico, Rol,
};
pub use error::{DomainError, Result};
pub use finance::{agregar, FilaFinanzas, FiltroFinanzas, ResumenFinanzas, Subtotal};
pub use lifecycle::{aplicar, autorizar, validar_transicion, Actor, Transicion};
pub use settlement::{
    liquidar, normalizar_tasa, redondear, LineaLiquidada, LineaResuelta, Liquidacion,
};
