//! Console tables for cost breakdowns and deployment results.

use alloy_core::primitives::U256;
use comfy_table::{Table, presets::UTF8_FULL};

use crate::{
    estimate::{DeploymentPlan, Sufficiency},
    runner::DeployedAddresses,
    units::format_native,
};

fn table(header: [&str; 2]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header.to_vec());
    table
}

/// Gas and cost breakdown of a plan, checked against `balance`.
pub fn plan_table(plan: &DeploymentPlan, balance: U256) -> Table {
    let mut table = table(["Item", "Value"]);
    table
        .add_row(vec![
            "Predicted implementation".to_string(),
            plan.predicted_implementation.to_string(),
        ])
        .add_row(vec![
            "Implementation gas".to_string(),
            plan.implementation_gas.to_string(),
        ])
        .add_row(vec!["Proxy gas".to_string(), plan.proxy_gas.to_string()])
        .add_row(vec!["Total gas".to_string(), plan.total_gas.to_string()])
        .add_row(vec![
            "Gas price".to_string(),
            format!("{} wei", plan.gas_price),
        ])
        .add_row(vec![
            "Estimated cost".to_string(),
            format_native(plan.estimated_cost),
        ])
        .add_row(vec![
            "Safety buffer (20%)".to_string(),
            format_native(plan.safety_buffer),
        ])
        .add_row(vec![
            "Required balance".to_string(),
            format_native(plan.required_balance),
        ])
        .add_row(vec!["Operator balance".to_string(), format_native(balance)]);

    let status = match plan.sufficiency(balance) {
        Sufficiency::Met { surplus } => format!("sufficient ({} spare)", format_native(surplus)),
        Sufficiency::Short { deficit } => format!("short by {}", format_native(deficit)),
    };
    table.add_row(vec!["Status".to_string(), status]);
    table
}

pub fn addresses_table(addresses: &DeployedAddresses) -> Table {
    let mut table = table(["Contract", "Address"]);
    for (name, address) in addresses.iter() {
        table.add_row(vec![name.to_string(), address.to_string()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::{Address, Bytes};

    #[test]
    fn test_plan_table_reports_shortfall() {
        let one = 1_000_000_000_000_000_000u128;
        let plan = DeploymentPlan::from_probes(Address::ZERO, Bytes::new(), 4, 6, one);
        let rendered = plan_table(&plan, U256::from(5 * one)).to_string();
        assert!(rendered.contains("12 HBAR"));
        assert!(rendered.contains("short by 7 HBAR"));
    }
}
