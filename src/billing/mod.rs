mod frisbii;

pub use frisbii::*;
