use derive_more::{Deref, Display, From, Into};
use log::trace;
use typed_index_collections::TiVec;

use crate::{parse::Table, problem::Problem};

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash)]
pub struct PeriodIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash)]
pub struct FinalIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash)]
pub struct SemiIndex(usize);

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, From, Into, Clone, Copy, Hash)]
pub struct RawIndex(usize);

/// The three inventory tiers of the supply chain
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Raw,
    Semi,
    Final,
}

/// sets for the planning model
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Periods, in planning order
    pub T: Vec<PeriodIndex>,
    /// Final products
    pub I: Vec<FinalIndex>,
    /// Semi products
    pub J: Vec<SemiIndex>,
    /// Raw materials
    pub K: Vec<RawIndex>,
}

impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        macro_rules! set {
            ($type:ident, $n:expr) => {
                (0..$n).map($type).collect::<Vec<_>>()
            };
        }

        Sets {
            T: set!(PeriodIndex, problem.periods().len()),
            I: set!(FinalIndex, problem.finals().len()),
            J: set!(SemiIndex, problem.semis().len()),
            K: set!(RawIndex, problem.raws().len()),
        }
    }

    /// The period before `t`, if any
    pub fn previous(&self, t: PeriodIndex) -> Option<PeriodIndex> {
        t.checked_sub(1).map(PeriodIndex)
    }
}

/// parameters for the planning model
#[derive(Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Parameters {
    /// demand of final product i in period t
    pub D: TiVec<FinalIndex, TiVec<PeriodIndex, f64>>,
    /// units of raw material k used per unit of semi product j
    pub BOMS: TiVec<SemiIndex, TiVec<RawIndex, f64>>,
    /// units of semi product j used per unit of final product i
    pub BOMF: TiVec<FinalIndex, TiVec<SemiIndex, f64>>,
    /// price of raw material k in period t
    pub PR: TiVec<RawIndex, TiVec<PeriodIndex, f64>>,
    /// market price of final product i in period t
    pub MPF: TiVec<FinalIndex, TiVec<PeriodIndex, f64>>,
    /// market price of semi product j in period t
    pub MPS: TiVec<SemiIndex, TiVec<PeriodIndex, f64>>,

    /// unit production cost of semi products
    pub PVCS: f64,
    /// unit production cost of final products
    pub PVCF: f64,
    /// setup cost of semi products
    pub SCPS: f64,
    /// setup cost of final products
    pub SCPF: f64,

    /// inventory cost per unit of raw material
    pub ICR: f64,
    /// inventory cost per unit of semi product
    pub ICS: f64,
    /// inventory cost per unit of final product
    pub ICF: f64,

    pub IRCap: f64,
    pub ISCap: f64,
    pub IFCap: f64,
    pub PSCap: f64,
    pub PFCap: f64,

    /// maximum number of semi products set up in one period
    pub PSSL: f64,
    /// maximum number of final products set up in one period
    pub PFSL: f64,

    /// lot size of raw material purchases
    pub LSR: f64,
    /// sell/buy price ratio for semi products traded with subcontractors
    pub SBR: f64,
    pub BigM: f64,
}

#[allow(non_snake_case)]
impl Parameters {
    pub fn new(problem: &Problem) -> Parameters {
        trace!("Building parameters");
        let tables = problem.tables();
        let s = problem.scalars();

        Parameters {
            D: dense(&tables.demand, problem.finals(), problem.periods()),
            BOMS: dense(&tables.bom_semi, problem.semis(), problem.raws()),
            BOMF: dense(&tables.bom_final, problem.finals(), problem.semis()),
            PR: dense(&tables.raw_price, problem.raws(), problem.periods()),
            MPF: dense(&tables.final_price, problem.finals(), problem.periods()),
            MPS: dense(&tables.semi_price, problem.semis(), problem.periods()),
            PVCS: s.production_cost_semi,
            PVCF: s.production_cost_final,
            SCPS: s.setup_cost_semi,
            SCPF: s.setup_cost_final,
            ICR: s.inventory_cost_raw,
            ICS: s.inventory_cost_semi,
            ICF: s.inventory_cost_final,
            IRCap: s.inventory_capacity_raw,
            ISCap: s.inventory_capacity_semi,
            IFCap: s.inventory_capacity_final,
            PSCap: s.production_capacity_semi,
            PFCap: s.production_capacity_final,
            PSSL: s.setup_limit_semi,
            PFSL: s.setup_limit_final,
            LSR: s.lot_size,
            SBR: s.sell_buy_ratio,
            BigM: s.big_m,
        }
    }

    /// The big-M used to gate semi production. Production never exceeds the capacity,
    /// so the capacity is a valid (and much tighter) bound whenever it is below `BigM`.
    pub fn M_semi(&self) -> f64 {
        f64::min(self.BigM, self.PSCap)
    }

    /// The big-M used to gate final production, see [`Parameters::M_semi`].
    pub fn M_final(&self) -> f64 {
        f64::min(self.BigM, self.PFCap)
    }

    /// Inventory holding cost of the given tier
    pub fn inventory_cost_mut(&mut self, tier: Tier) -> &mut f64 {
        match tier {
            Tier::Raw => &mut self.ICR,
            Tier::Semi => &mut self.ICS,
            Tier::Final => &mut self.ICF,
        }
    }

    /// A copy of these parameters with `overrides` applied in order. `self` is left untouched.
    pub fn with_overrides(&self, overrides: &[Override]) -> Parameters {
        let mut parameters = self.clone();
        for o in overrides {
            trace!("Applying {o}");
            match *o {
                Override::Demand { product, factor } => {
                    parameters.D[product].iter_mut().for_each(|d| *d *= factor)
                }
                Override::RawPrice { material, factor } => {
                    parameters.PR[material].iter_mut().for_each(|p| *p *= factor)
                }
                Override::FinalPrice { product, factor } => {
                    parameters.MPF[product].iter_mut().for_each(|p| *p *= factor)
                }
                Override::LotSize(size) => parameters.LSR = size,
                Override::InventoryCost { tier, rate } => {
                    *parameters.inventory_cost_mut(tier) = rate
                }
                Override::SellBuyRatio(ratio) => parameters.SBR = ratio,
            }
        }
        parameters
    }
}

/// A single change to the parameters of the planning model.
///
/// Time series are scaled by `factor` in every period, scalars are replaced.
#[derive(Debug, Display, Clone, Copy, PartialEq)]
pub enum Override {
    #[display(fmt = "demand of {:?} x {}", product, factor)]
    Demand { product: FinalIndex, factor: f64 },
    #[display(fmt = "raw price of {:?} x {}", material, factor)]
    RawPrice { material: RawIndex, factor: f64 },
    #[display(fmt = "final price of {:?} x {}", product, factor)]
    FinalPrice { product: FinalIndex, factor: f64 },
    #[display(fmt = "lot size = {}", _0)]
    LotSize(f64),
    #[display(fmt = "{} inventory cost = {}", tier, rate)]
    InventoryCost { tier: Tier, rate: f64 },
    #[display(fmt = "sell/buy ratio = {}", _0)]
    SellBuyRatio(f64),
}

/// Dense lookup of `table` in the order given by `rows` and `columns`.
/// The labels have been validated by `Problem::new`, so every lookup succeeds.
fn dense<R, C>(table: &Table, rows: &[String], columns: &[String]) -> TiVec<R, TiVec<C, f64>> {
    rows.iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| table.get(r, c).unwrap_or_default() as f64)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::tests::{ample, single_chain};

    #[test]
    fn sets_follow_problem_labels() {
        let problem = single_chain(&[1, 2, 3], ample());
        let sets = Sets::new(&problem);
        assert_eq!(sets.T, vec![PeriodIndex(0), PeriodIndex(1), PeriodIndex(2)]);
        assert_eq!(sets.I, vec![FinalIndex(0)]);
        assert_eq!(sets.previous(PeriodIndex(0)), None);
        assert_eq!(sets.previous(PeriodIndex(2)), Some(PeriodIndex(1)));
    }

    #[test]
    fn parameters_are_dense_copies_of_the_tables() {
        let problem = single_chain(&[7, 9], ample());
        let parameters = Parameters::new(&problem);
        let a = FinalIndex(0);
        assert_eq!(parameters.D[a].iter().copied().collect::<Vec<_>>(), vec![7.0, 9.0]);
        assert_eq!(parameters.MPF[a][PeriodIndex(1)], 100.0);
        assert_eq!(parameters.BOMS[SemiIndex(0)][RawIndex(0)], 1.0);
        assert_eq!(parameters.M_final(), 10_000.0);
    }

    #[test]
    fn overrides_leave_the_base_untouched() {
        let problem = single_chain(&[10, 20], ample());
        let base = Parameters::new(&problem);
        let snapshot = base.clone();

        let changed = base.with_overrides(&[
            Override::Demand {
                product: FinalIndex(0),
                factor: 1.5,
            },
            Override::InventoryCost {
                tier: Tier::Semi,
                rate: 7.0,
            },
            Override::LotSize(250.0),
        ]);

        assert_eq!(base, snapshot);
        assert_eq!(changed.D[FinalIndex(0)][PeriodIndex(1)], 30.0);
        assert_eq!(changed.ICS, 7.0);
        assert_eq!(changed.ICR, base.ICR);
        assert_eq!(changed.ICF, base.ICF);
        assert_eq!(changed.LSR, 250.0);
        assert_ne!(changed, base);
    }

    #[test]
    fn neutral_overrides_reproduce_the_base() {
        let problem = single_chain(&[10, 20], ample());
        let base = Parameters::new(&problem);
        let same = base.with_overrides(&[
            Override::RawPrice {
                material: RawIndex(0),
                factor: 1.0,
            },
            Override::FinalPrice {
                product: FinalIndex(0),
                factor: 1.0,
            },
            Override::SellBuyRatio(base.SBR),
        ]);
        assert_eq!(same, base);
    }
}
