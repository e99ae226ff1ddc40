pub mod analyzer;
pub mod measures;
pub mod normality;
pub mod outliers;
pub mod robust;
pub mod series;
