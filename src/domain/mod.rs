//! Domain entities, DTOs and business rules
//!
//! Pure calculations (line amounts, approval chains, payslip arithmetic)
//! live here so they can be tested without a database.

pub mod assets;
pub mod bills;
pub mod boqs;
pub mod budgets;
pub mod cashbooks;
pub mod challans;
pub mod companies;
pub mod manpower;
pub mod org;
pub mod payroll;
pub mod sites;
pub mod users;
