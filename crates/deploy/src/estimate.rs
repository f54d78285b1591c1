//! Cost estimation for the implementation + proxy deployment pair.

use alloy_core::{
    primitives::{Address, Bytes, U256},
    sol_types::SolValue,
};
use anyhow::Context;

use crate::{
    DeployError,
    chain::{CallRequest, ChainClient},
};

/// Safety buffer as a divisor of the estimated cost (20%).
const SAFETY_BUFFER_DIVISOR: u64 = 5;

/// Everything computed before a deployment. Rebuilt on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub predicted_implementation: Address,
    pub initializer_call_data: Bytes,
    pub implementation_gas: u64,
    pub proxy_gas: u64,
    pub total_gas: u64,
    pub gas_price: u128,
    pub estimated_cost: U256,
    pub safety_buffer: U256,
    pub required_balance: U256,
}

/// Whether a balance covers [`DeploymentPlan::required_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sufficiency {
    Met { surplus: U256 },
    Short { deficit: U256 },
}

impl DeploymentPlan {
    /// Combine the probe results: `required = cost + cost / 5`.
    pub fn from_probes(
        predicted_implementation: Address,
        initializer_call_data: Bytes,
        implementation_gas: u64,
        proxy_gas: u64,
        gas_price: u128,
    ) -> Self {
        let total_gas = implementation_gas.saturating_add(proxy_gas);
        let estimated_cost = U256::from(total_gas) * U256::from(gas_price);
        let safety_buffer = estimated_cost / U256::from(SAFETY_BUFFER_DIVISOR);

        Self {
            predicted_implementation,
            initializer_call_data,
            implementation_gas,
            proxy_gas,
            total_gas,
            gas_price,
            estimated_cost,
            safety_buffer,
            required_balance: estimated_cost + safety_buffer,
        }
    }

    pub fn sufficiency(&self, balance: U256) -> Sufficiency {
        if balance >= self.required_balance {
            Sufficiency::Met {
                surplus: balance - self.required_balance,
            }
        } else {
            Sufficiency::Short {
                deficit: self.required_balance - balance,
            }
        }
    }
}

/// Proxy creation code: bytecode followed by the ABI-encoded constructor
/// `(implementation, initializerCallData)`.
pub fn proxy_creation_code(
    proxy_bytecode: &Bytes,
    implementation: Address,
    init: &Bytes,
) -> Bytes {
    let args = (implementation, init.clone()).abi_encode_params();
    let mut code = Vec::with_capacity(proxy_bytecode.len() + args.len());
    code.extend_from_slice(proxy_bytecode);
    code.extend_from_slice(&args);
    code.into()
}

/// Probes gas for both deployments and the gas price.
pub struct CostEstimator<'a, C> {
    client: &'a C,
}

impl<'a, C: ChainClient> CostEstimator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Issue the three probes concurrently and combine them once all have settled.
    ///
    /// Any probe failure fails the whole estimate; nothing is retried.
    pub async fn estimate(
        &self,
        operator: Address,
        predicted_implementation: Address,
        initializer_call_data: Bytes,
        implementation_bytecode: &Bytes,
        proxy_bytecode: &Bytes,
    ) -> Result<DeploymentPlan, DeployError> {
        let implementation_request =
            CallRequest::deploy(operator, implementation_bytecode.clone());
        let proxy_request = CallRequest::deploy(
            operator,
            proxy_creation_code(proxy_bytecode, predicted_implementation, &initializer_call_data),
        );

        let (implementation_gas, proxy_gas, gas_price) = futures::join!(
            self.client.estimate_gas(&implementation_request),
            self.client.estimate_gas(&proxy_request),
            self.client.gas_price(),
        );

        let implementation_gas = implementation_gas
            .context("Failed to estimate implementation deployment gas")
            .map_err(DeployError::Estimation)?;
        let proxy_gas = proxy_gas
            .context("Failed to estimate proxy deployment gas")
            .map_err(DeployError::Estimation)?;
        let gas_price = gas_price
            .context("Failed to fetch gas price")
            .map_err(DeployError::Estimation)?;

        tracing::debug!(
            implementation_gas,
            proxy_gas,
            gas_price = %gas_price,
            "Cost probes settled"
        );

        Ok(DeploymentPlan::from_probes(
            predicted_implementation,
            initializer_call_data,
            implementation_gas,
            proxy_gas,
            gas_price,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use alloy_core::primitives::B256;
    use tokio::sync::{Barrier, watch};

    use super::*;
    use crate::chain::TransactionReceipt;

    const ONE: u128 = 1_000_000_000_000_000_000;

    const IMPLEMENTATION_CODE: [u8; 1] = [0x60];

    enum Rendezvous {
        /// Nothing is answered before all three queries are in flight.
        AllQueries(Barrier),
        /// Gas estimates wait for the gas price to be answered.
        PriceFirst(watch::Sender<bool>),
    }

    struct RendezvousChain {
        rendezvous: Rendezvous,
        settled: Mutex<Vec<&'static str>>,
    }

    impl RendezvousChain {
        fn new(rendezvous: Rendezvous) -> Self {
            Self {
                rendezvous,
                settled: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChainClient for RendezvousChain {
        fn sender(&self) -> Option<Address> {
            None
        }

        async fn chain_id(&self) -> anyhow::Result<u64> {
            anyhow::bail!("not used")
        }

        async fn get_balance(&self, _address: Address) -> anyhow::Result<U256> {
            anyhow::bail!("not used")
        }

        async fn get_transaction_count(&self, _address: Address) -> anyhow::Result<u64> {
            anyhow::bail!("not used")
        }

        async fn estimate_gas(&self, request: &CallRequest) -> anyhow::Result<u64> {
            match &self.rendezvous {
                Rendezvous::AllQueries(barrier) => {
                    barrier.wait().await;
                }
                Rendezvous::PriceFirst(price) => {
                    price.subscribe().wait_for(|answered| *answered).await?;
                }
            }
            self.settled.lock().unwrap().push("estimate_gas");
            Ok(if request.data[..] == IMPLEMENTATION_CODE { 4 } else { 6 })
        }

        async fn gas_price(&self) -> anyhow::Result<u128> {
            if let Rendezvous::AllQueries(barrier) = &self.rendezvous {
                barrier.wait().await;
            }
            self.settled.lock().unwrap().push("gas_price");
            if let Rendezvous::PriceFirst(price) = &self.rendezvous {
                price.send_replace(true);
            }
            Ok(ONE)
        }

        async fn get_storage_at(&self, _address: Address, _slot: B256) -> anyhow::Result<B256> {
            anyhow::bail!("not used")
        }

        async fn call(&self, _request: &CallRequest) -> anyhow::Result<Bytes> {
            anyhow::bail!("not used")
        }

        async fn send_transaction(&self, _request: CallRequest) -> anyhow::Result<B256> {
            anyhow::bail!("not used")
        }

        async fn wait_for_receipt(&self, _hash: B256) -> anyhow::Result<TransactionReceipt> {
            anyhow::bail!("not used")
        }
    }

    async fn estimate_with(chain: &RendezvousChain) -> DeploymentPlan {
        let estimator = CostEstimator::new(chain);
        let implementation_code = Bytes::from_static(&IMPLEMENTATION_CODE);
        let proxy_code = Bytes::from_static(&[0x60, 0x80]);
        let estimate = estimator.estimate(
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            Bytes::from_static(&[0xaa]),
            &implementation_code,
            &proxy_code,
        );
        tokio::time::timeout(Duration::from_secs(5), estimate)
            .await
            .expect("the three queries must be in flight together")
            .unwrap()
    }

    fn ten_unit_plan() -> DeploymentPlan {
        // 4 + 6 gas at one whole unit per gas: a cost of exactly 10.
        DeploymentPlan::from_probes(Address::ZERO, Bytes::new(), 4, 6, ONE)
    }

    #[test]
    fn test_required_is_cost_plus_fifth() {
        let plan = ten_unit_plan();
        assert_eq!(plan.total_gas, 10);
        assert_eq!(plan.estimated_cost, U256::from(10 * ONE));
        assert_eq!(plan.safety_buffer, U256::from(2 * ONE));
        assert_eq!(
            plan.required_balance,
            plan.estimated_cost + plan.estimated_cost / U256::from(5)
        );

        let odd = DeploymentPlan::from_probes(Address::ZERO, Bytes::new(), 7, 0, 1);
        assert_eq!(odd.required_balance, U256::from(8));
    }

    #[tokio::test]
    async fn test_gas_queries_are_in_flight_together() {
        let chain = RendezvousChain::new(Rendezvous::AllQueries(Barrier::new(3)));
        let plan = estimate_with(&chain).await;

        assert_eq!(
            plan,
            DeploymentPlan::from_probes(
                Address::repeat_byte(0x02),
                Bytes::from_static(&[0xaa]),
                4,
                6,
                ONE
            )
        );
        assert_eq!(chain.settled.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_combination_ignores_completion_order() {
        let chain = RendezvousChain::new(Rendezvous::PriceFirst(watch::channel(false).0));
        let plan = estimate_with(&chain).await;

        assert_eq!(
            *chain.settled.lock().unwrap(),
            ["gas_price", "estimate_gas", "estimate_gas"]
        );
        assert_eq!(plan.implementation_gas, 4);
        assert_eq!(plan.proxy_gas, 6);
        assert_eq!(plan.gas_price, ONE);
        assert_eq!(plan.estimated_cost, U256::from(10 * ONE));
        assert_eq!(plan.required_balance, U256::from(12 * ONE));
    }

    #[test]
    fn test_sufficiency() {
        let plan = ten_unit_plan();
        assert_eq!(
            plan.sufficiency(U256::from(50 * ONE)),
            Sufficiency::Met {
                surplus: U256::from(38 * ONE)
            }
        );
        assert_eq!(
            plan.sufficiency(U256::from(5 * ONE)),
            Sufficiency::Short {
                deficit: U256::from(7 * ONE)
            }
        );
        assert!(matches!(plan.sufficiency(U256::from(12 * ONE)), Sufficiency::Met { .. }));
    }

    #[test]
    fn test_proxy_creation_code_layout() {
        let bytecode = Bytes::from_static(&[0x60, 0x80]);
        let init = Bytes::from_static(&[0xaa, 0xbb, 0xcc, 0xdd]);
        let code = proxy_creation_code(&bytecode, Address::repeat_byte(0x11), &init);

        // bytecode | address word | offset word | length word | padded data word
        assert_eq!(code.len(), 2 + 32 * 4);
        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(&code[2 + 12..2 + 32], Address::repeat_byte(0x11).as_slice());
        assert_eq!(code[2 + 63], 0x40);
        assert_eq!(code[2 + 95], 4);
        assert_eq!(&code[2 + 96..2 + 100], &[0xaa, 0xbb, 0xcc, 0xdd]);
    }
}
