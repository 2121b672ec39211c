//! Persistent collections, keyed by stable business identifiers.
//!
//! Every cross-entity reference is the referenced row's business `Uuid`;
//! no record carries two representations of the same logical reference.

pub mod approval_policy;
pub mod employee;
pub mod goods_receipt;
pub mod order;
pub mod order_item;
pub mod product;
pub mod provider_credential;
pub mod purchase_order;
pub mod shipment;
pub mod site_admin_location;
pub mod vendor;

pub use approval_policy::Entity as ApprovalPolicy;
pub use employee::Entity as Employee;
pub use goods_receipt::Entity as GoodsReceipt;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use provider_credential::Entity as ProviderCredential;
pub use purchase_order::Entity as PurchaseOrder;
pub use shipment::Entity as Shipment;
pub use site_admin_location::Entity as SiteAdminLocation;
pub use vendor::Entity as Vendor;
