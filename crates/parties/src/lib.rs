//! Parties domain module: addresses and customers of marketplace orders.
//!
//! Pure resolution logic (no IO, no storage): which address entries become
//! billing/shipping records, and who the customer is.

pub mod address;
pub mod customer;
pub mod name;

pub use address::{
    Address, AddressPlan, AddressRole, NewAddress, address_unique_id, merge_street,
    select_by_language,
};
pub use customer::{Customer, CustomerIdentity, NewCustomer, OrderContact};
pub use name::PersonName;
