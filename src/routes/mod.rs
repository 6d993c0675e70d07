pub mod assets;
pub mod auth;
pub mod bills;
pub mod boqs;
pub mod budgets;
pub mod cashbooks;
pub mod challans;
pub mod companies;
pub mod health;
pub mod manpower;
pub mod org;
pub mod payroll;
pub mod sites;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/auth/login", post(auth::login))
        // Session
        .route("/me", get(auth::get_me))
        // Companies
        .route("/companies", get(companies::list_companies).post(companies::create_company))
        .route(
            "/companies/:company_id",
            get(companies::get_company)
                .patch(companies::update_company)
                .delete(companies::delete_company),
        )
        // Sites
        .route("/sites", get(sites::list_sites).post(sites::create_site))
        .route(
            "/sites/:site_id",
            get(sites::get_site).patch(sites::update_site).delete(sites::delete_site),
        )
        .route("/sites/:site_id/cashbook/summary", get(cashbooks::site_summary))
        // Lookups
        .route("/departments", get(org::list_departments).post(org::create_department))
        .route(
            "/departments/:id",
            patch(org::update_department).delete(org::delete_department),
        )
        .route("/zones", get(org::list_zones).post(org::create_zone))
        .route("/zones/:id", patch(org::update_zone).delete(org::delete_zone))
        .route(
            "/rental-categories",
            get(org::list_rental_categories).post(org::create_rental_category),
        )
        .route(
            "/rental-categories/:id",
            patch(org::update_rental_category).delete(org::delete_rental_category),
        )
        // BOQs
        .route("/boqs", get(boqs::list_boqs).post(boqs::create_boq))
        .route(
            "/boqs/:boq_id",
            get(boqs::get_boq).patch(boqs::update_boq).delete(boqs::delete_boq),
        )
        .route("/boqs/:boq_id/items", get(boqs::list_boq_items).post(boqs::create_boq_item))
        .route(
            "/boqs/:boq_id/items/:item_id",
            patch(boqs::update_boq_item).delete(boqs::delete_boq_item),
        )
        .route("/boqs/:boq_id/progress", get(boqs::get_boq_progress))
        // Bills (nested under BOQs)
        .route("/boqs/:boq_id/bills", get(bills::list_bills).post(bills::create_bill))
        .route(
            "/boqs/:boq_id/bills/:bill_id",
            get(bills::get_bill).patch(bills::update_bill).delete(bills::delete_bill),
        )
        // Cashbook
        .route(
            "/cashbook/entries",
            get(cashbooks::list_entries).post(cashbooks::create_entry),
        )
        .route(
            "/cashbook/entries/:entry_id",
            get(cashbooks::get_entry)
                .patch(cashbooks::update_entry)
                .delete(cashbooks::delete_entry),
        )
        // Budgets
        .route("/budgets", get(budgets::list_budgets).post(budgets::create_budget))
        .route(
            "/budgets/:budget_id",
            get(budgets::get_budget)
                .patch(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route("/budgets/:budget_id/items", put(budgets::replace_budget_items))
        .route("/budgets/:budget_id/first-approval", post(budgets::first_approve_budget))
        .route("/budgets/:budget_id/approval", post(budgets::approve_budget))
        .route("/budgets/:budget_id/acceptance", post(budgets::accept_budget))
        // Manpower suppliers
        .route(
            "/manpower-suppliers",
            get(manpower::list_suppliers).post(manpower::create_supplier),
        )
        .route(
            "/manpower-suppliers/:supplier_id",
            patch(manpower::update_supplier).delete(manpower::delete_supplier),
        )
        // Manpower
        .route("/manpower", get(manpower::list_manpower).post(manpower::create_manpower))
        .route(
            "/manpower/:manpower_id",
            get(manpower::get_manpower)
                .patch(manpower::update_manpower)
                .delete(manpower::delete_manpower),
        )
        .route("/manpower/:manpower_id/assignment", get(manpower::get_assignment))
        // Transfers
        .route(
            "/manpower-transfers",
            get(manpower::list_transfers).post(manpower::create_transfer),
        )
        .route("/manpower-transfers/:transfer_id/accept", post(manpower::accept_transfer))
        .route("/manpower-transfers/:transfer_id/reject", post(manpower::reject_transfer))
        // Assets
        .route("/assets", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/assets/:asset_id",
            get(assets::get_asset).patch(assets::update_asset).delete(assets::delete_asset),
        )
        // Payroll
        .route("/employees", get(payroll::list_employees).post(payroll::create_employee))
        .route(
            "/employees/:employee_id",
            get(payroll::get_employee)
                .patch(payroll::update_employee)
                .delete(payroll::delete_employee),
        )
        .route("/payslips", get(payroll::list_payslips).post(payroll::create_payslip))
        .route(
            "/payslips/:payslip_id",
            get(payroll::get_payslip).delete(payroll::delete_payslip),
        )
        // Challans
        .route(
            "/challans/outward",
            get(challans::list_outward_challans).post(challans::create_outward_challan),
        )
        .route(
            "/challans/outward/:challan_id",
            get(challans::get_outward_challan).delete(challans::delete_outward_challan),
        )
        .route(
            "/challans/outward/:challan_id/approval",
            post(challans::approve_outward_challan),
        )
        .route(
            "/challans/outward/:challan_id/dispatch",
            post(challans::dispatch_outward_challan),
        )
        .route(
            "/challans/outward/:challan_id/receipt",
            post(challans::receive_outward_challan),
        )
        .route(
            "/challans/inward",
            get(challans::list_inward_challans).post(challans::create_inward_challan),
        )
        .route(
            "/challans/inward/:challan_id",
            get(challans::get_inward_challan).delete(challans::delete_inward_challan),
        )
}
