pub mod bond;
pub mod correlation;
pub mod moex;
