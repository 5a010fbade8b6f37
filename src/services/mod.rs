// Core services
pub mod adjustment;
pub mod allocation;
pub mod balance;
pub mod ledger;
pub mod lot_repository;

pub use adjustment::{AdjustmentPreview, AdjustmentRequest, AdjustmentService, AdjustmentType};
pub use allocation::{AllocationPlanner, AllocationStrategy, ConsumptionPlan, PlanLine};
pub use balance::{ExpiryStatus, LotExpiry, StockBalance, StockBalanceService, StockStatus};
pub use ledger::{
    AdjustmentReason, Destination, MovementLedger, MovementMetadata, NewLotFields, ReceiptOutcome,
};
pub use lot_repository::LotRepository;
