mod pullsubscription;

pub use pullsubscription::*;
