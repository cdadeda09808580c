use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationStrategy {
    AggressiveGrowth,
    ConservativeIncome,
    Custom,
}

/// Asset-class weights in percent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMix {
    pub equity: f64,
    pub metals: f64,
    pub debt: f64,
    pub cash: f64,
}

const AGGRESSIVE_GROWTH_MIX: AssetMix = AssetMix {
    equity: 60.0,
    metals: 20.0,
    debt: 10.0,
    cash: 10.0,
};
const AGGRESSIVE_GROWTH_RETURN: f64 = 0.08;

const CONSERVATIVE_INCOME_MIX: AssetMix = AssetMix {
    equity: 20.0,
    metals: 10.0,
    debt: 40.0,
    cash: 30.0,
};
const CONSERVATIVE_INCOME_RETURN: f64 = 0.05;

// Assumed long-run annual returns per asset class.
const EQUITY_RETURN: f64 = 0.09;
const METALS_RETURN: f64 = 0.04;
const DEBT_RETURN: f64 = 0.04;
const CASH_RETURN: f64 = 0.02;

impl AssetMix {
    pub fn total(self) -> f64 {
        self.equity + self.metals + self.debt + self.cash
    }

    pub fn weighted_return(self) -> f64 {
        (self.equity * EQUITY_RETURN
            + self.metals * METALS_RETURN
            + self.debt * DEBT_RETURN
            + self.cash * CASH_RETURN)
            / 100.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAllocation {
    pub strategy: AllocationStrategy,
    pub mix: AssetMix,
    pub estimated_return: f64,
}

/// Maps a strategy to its mix and historical return estimate. `custom_mix`
/// is only read for `AllocationStrategy::Custom`.
pub fn resolve_allocation(
    strategy: AllocationStrategy,
    custom_mix: AssetMix,
) -> Result<ResolvedAllocation, String> {
    let (mix, estimated_return) = match strategy {
        AllocationStrategy::AggressiveGrowth => (AGGRESSIVE_GROWTH_MIX, AGGRESSIVE_GROWTH_RETURN),
        AllocationStrategy::ConservativeIncome => {
            (CONSERVATIVE_INCOME_MIX, CONSERVATIVE_INCOME_RETURN)
        }
        AllocationStrategy::Custom => {
            for (name, weight) in [
                ("--equity", custom_mix.equity),
                ("--metals", custom_mix.metals),
                ("--debt", custom_mix.debt),
                ("--cash", custom_mix.cash),
            ] {
                if !(0.0..=100.0).contains(&weight) {
                    return Err(format!("{name} must be between 0 and 100"));
                }
            }
            if (custom_mix.total() - 100.0).abs() > 1e-9 {
                return Err(format!(
                    "custom allocation must sum to 100, got {}",
                    custom_mix.total()
                ));
            }
            (custom_mix, custom_mix.weighted_return())
        }
    };

    Ok(ResolvedAllocation {
        strategy,
        mix,
        estimated_return,
    })
}
