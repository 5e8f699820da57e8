//! HTTP handlers, one module per resource family.

pub mod catalogo;
pub mod consultas;
pub mod finanzas;
pub mod health;
pub mod importacion;
pub mod informes;
pub mod pacientes;
pub mod remisiones;
