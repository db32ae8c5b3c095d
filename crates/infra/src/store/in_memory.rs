use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ordersync_core::{Entity, EntityId, EntityKind, LocalId, StoreId};
use ordersync_inventory::{Product, StockAttribute, StockItem};
use ordersync_parties::{Address, Customer};
use ordersync_sales::{Order, OrderComment, OrderItem, OrderStatus};

use super::{EntityStore, StoreResult};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<EntityId, Order>,
    /// Insertion order doubles as the item order of each order.
    order_items: Vec<OrderItem>,
    addresses: HashMap<(StoreId, String), Address>,
    customers: HashMap<(StoreId, String), Customer>,
    products: HashMap<(StoreId, String), Product>,
    stock_items: HashMap<(StoreId, String), StockItem>,
    links: HashMap<(EntityKind, EntityId), LocalId>,
    comments: Vec<(EntityId, OrderComment)>,
    stock_adjustments: HashSet<(EntityId, StockAttribute)>,
}

/// In-memory entity store for tests/dev.
///
/// Transactions snapshot the whole table set on `begin` and restore it on
/// `rollback`; they are not isolated from each other.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
    transactions: Mutex<HashMap<String, Tables>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a catalog product (products are owned elsewhere).
    pub fn insert_product(&self, store: &StoreId, product: Product) -> StoreResult<()> {
        self.write()?
            .products
            .insert((store.clone(), product.sku.clone()), product);
        Ok(())
    }

    /// Seed a stock item (stock records are owned elsewhere).
    pub fn insert_stock_item(&self, store: &StoreId, item: StockItem) -> StoreResult<()> {
        self.write()?
            .stock_items
            .insert((store.clone(), item.sku.clone()), item);
        Ok(())
    }

    pub fn orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.read()?.orders.values().cloned().collect())
    }

    pub fn customers(&self) -> StoreResult<Vec<Customer>> {
        Ok(self.read()?.customers.values().cloned().collect())
    }

    pub fn addresses(&self) -> StoreResult<Vec<Address>> {
        Ok(self.read()?.addresses.values().cloned().collect())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl EntityStore for InMemoryEntityStore {
    fn local_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<LocalId>> {
        Ok(self.read()?.links.get(&(kind, id)).cloned())
    }

    fn link(&self, kind: EntityKind, id: EntityId, local_id: &LocalId) -> StoreResult<()> {
        self.write()?.links.insert((kind, id), local_id.clone());
        Ok(())
    }

    fn unlink(&self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        self.write()?.links.remove(&(kind, id));
        Ok(())
    }

    fn find_order(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .read()?
            .orders
            .values()
            .find(|o| &o.store_id == store && o.unique_id == unique_id)
            .cloned())
    }

    fn find_order_by_local_id(&self, store: &StoreId, local_id: &LocalId) -> StoreResult<Option<Order>> {
        let tables = self.read()?;
        let found = tables
            .links
            .iter()
            .filter(|((kind, _), linked)| *kind == EntityKind::Order && *linked == local_id)
            .filter_map(|((_, id), _)| tables.orders.get(id))
            .find(|order| &order.store_id == store)
            .cloned();
        Ok(found)
    }

    fn load_order(&self, id: EntityId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    fn create_order(&self, order: Order) -> StoreResult<Order> {
        let mut tables = self.write()?;
        if tables
            .orders
            .values()
            .any(|o| o.store_id == order.store_id && o.unique_id == order.unique_id)
        {
            return Err(StoreError::Conflict(format!("order {} exists", order.unique_id)));
        }
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn update_order(&self, order: &Order) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Order, order.id))?;
        *stored = order.clone();
        Ok(())
    }

    fn set_order_status(&self, id: EntityId, status: Option<OrderStatus>) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Order, id))?;
        stored.status = status;
        Ok(())
    }

    fn family_orders(&self, order: &Order) -> StoreResult<Vec<Order>> {
        let root = order.family_root();
        let mut family: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| o.family_root() == root)
            .cloned()
            .collect();
        family.sort_by_key(|o| o.id);
        Ok(family)
    }

    fn add_comment(&self, order: EntityId, comment: OrderComment) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.orders.contains_key(&order) {
            return Err(StoreError::not_found(EntityKind::Order, order));
        }
        tables.comments.push((order, comment));
        Ok(())
    }

    fn comments(&self, order: EntityId) -> StoreResult<Vec<OrderComment>> {
        Ok(self
            .read()?
            .comments
            .iter()
            .filter(|(id, _)| *id == order)
            .map(|(_, comment)| comment.clone())
            .collect())
    }

    fn find_order_item(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<OrderItem>> {
        Ok(self
            .read()?
            .order_items
            .iter()
            .find(|i| &i.store_id == store && i.unique_id == unique_id)
            .cloned())
    }

    fn create_order_item(&self, item: OrderItem) -> StoreResult<OrderItem> {
        let mut tables = self.write()?;
        if !tables.orders.contains_key(&item.order_id) {
            return Err(StoreError::not_found(EntityKind::Order, item.order_id));
        }
        if tables
            .order_items
            .iter()
            .any(|i| i.store_id == item.store_id && i.unique_id == item.unique_id)
        {
            return Err(StoreError::Conflict(format!("order item {} exists", item.unique_id)));
        }
        tables.order_items.push(item.clone());
        Ok(item)
    }

    fn order_items(&self, order: EntityId) -> StoreResult<Vec<OrderItem>> {
        Ok(self
            .read()?
            .order_items
            .iter()
            .filter(|i| i.order_id == order)
            .cloned()
            .collect())
    }

    fn find_address(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Address>> {
        Ok(self
            .read()?
            .addresses
            .get(&(store.clone(), unique_id.to_string()))
            .cloned())
    }

    fn create_address(&self, store: &StoreId, address: Address) -> StoreResult<Address> {
        let mut tables = self.write()?;
        let key = (store.clone(), address.unique_id().to_string());
        if tables.addresses.contains_key(&key) {
            return Err(StoreError::Conflict(format!("address {} exists", key.1)));
        }
        tables.addresses.insert(key, address.clone());
        Ok(address)
    }

    fn find_customer(&self, store: &StoreId, email: &str) -> StoreResult<Option<Customer>> {
        Ok(self
            .read()?
            .customers
            .get(&(store.clone(), email.to_string()))
            .cloned())
    }

    fn create_customer(&self, store: &StoreId, customer: Customer) -> StoreResult<Customer> {
        let mut tables = self.write()?;
        let key = (store.clone(), customer.unique_id().to_string());
        if tables.customers.contains_key(&key) {
            return Err(StoreError::Conflict(format!("customer {} exists", key.1)));
        }
        tables.customers.insert(key, customer.clone());
        Ok(customer)
    }

    fn find_product(&self, store: &StoreId, sku: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .read()?
            .products
            .get(&(store.clone(), sku.to_string()))
            .cloned())
    }

    fn find_stock_item(&self, store: &StoreId, sku: &str) -> StoreResult<Option<StockItem>> {
        Ok(self
            .read()?
            .stock_items
            .get(&(store.clone(), sku.to_string()))
            .cloned())
    }

    fn update_stock_item(&self, store: &StoreId, item: &StockItem) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables
            .stock_items
            .get_mut(&(store.clone(), item.sku.clone()))
            .ok_or_else(|| StoreError::not_found(EntityKind::StockItem, &item.sku))?;
        *stored = item.clone();
        Ok(())
    }

    fn stock_adjusted(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<bool> {
        Ok(self.read()?.stock_adjustments.contains(&(item, attribute)))
    }

    fn record_stock_adjustment(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<()> {
        self.write()?.stock_adjustments.insert((item, attribute));
        Ok(())
    }

    fn begin_transaction(&self, key: &str) -> StoreResult<()> {
        let mut open = self.transactions.lock().map_err(|_| StoreError::Poisoned)?;
        if open.contains_key(key) {
            return Err(StoreError::Conflict(format!("transaction {key} already open")));
        }
        let snapshot = self.read()?.clone();
        open.insert(key.to_string(), snapshot);
        Ok(())
    }

    fn commit_transaction(&self, key: &str) -> StoreResult<()> {
        let mut open = self.transactions.lock().map_err(|_| StoreError::Poisoned)?;
        open.remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NoTransaction(key.to_string()))
    }

    fn rollback_transaction(&self, key: &str) -> StoreResult<()> {
        let mut open = self.transactions.lock().map_err(|_| StoreError::Poisoned)?;
        let snapshot = open
            .remove(key)
            .ok_or_else(|| StoreError::NoTransaction(key.to_string()))?;
        *self.write()? = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersync_sales::OrderData;

    fn order(store: &str, unique_id: &str) -> Order {
        Order::new(EntityId::new(), StoreId::new(store), unique_id, OrderData::default())
    }

    #[test]
    fn duplicate_orders_conflict() {
        let store = InMemoryEntityStore::new();
        store.create_order(order("mms-1", "MMS-1")).unwrap();

        let err = store.create_order(order("mms-1", "MMS-1")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.create_order(order("mms-2", "MMS-1")).unwrap();
    }

    #[test]
    fn orders_are_found_by_link_within_their_store() {
        let store = InMemoryEntityStore::new();
        let created = store.create_order(order("mms-1", "MMS-1")).unwrap();
        store
            .link(EntityKind::Order, created.id, &LocalId::new("55"))
            .unwrap();

        let local = LocalId::new("55");
        assert_eq!(
            store
                .find_order_by_local_id(&StoreId::new("mms-1"), &local)
                .unwrap()
                .map(|o| o.id),
            Some(created.id)
        );
        assert!(
            store
                .find_order_by_local_id(&StoreId::new("mms-2"), &local)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn second_begin_on_same_key_conflicts() {
        let store = InMemoryEntityStore::new();
        store.begin_transaction("mms-order-MMS-1").unwrap();

        let err = store.begin_transaction("mms-order-MMS-1").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.begin_transaction("mms-order-MMS-2").unwrap();
        store.commit_transaction("mms-order-MMS-1").unwrap();
        store.begin_transaction("mms-order-MMS-1").unwrap();
    }

    #[test]
    fn rollback_discards_writes() {
        let store = InMemoryEntityStore::new();
        store.begin_transaction("tx").unwrap();
        let created = store.create_order(order("mms-1", "MMS-1")).unwrap();
        store
            .link(EntityKind::Order, created.id, &LocalId::new("1"))
            .unwrap();
        store.rollback_transaction("tx").unwrap();

        assert!(store.load_order(created.id).unwrap().is_none());
        assert!(store.local_id(EntityKind::Order, created.id).unwrap().is_none());
        assert!(matches!(
            store.commit_transaction("tx"),
            Err(StoreError::NoTransaction(_))
        ));
    }

    #[test]
    fn family_includes_root_and_siblings() {
        let store = InMemoryEntityStore::new();
        let root = store.create_order(order("mms-1", "MMS-1")).unwrap();
        let mut sibling = order("mms-1", "MMS-1-2");
        sibling.original_order = Some(root.id);
        let sibling = store.create_order(sibling).unwrap();
        store.create_order(order("mms-1", "MMS-9")).unwrap();

        let family: HashSet<EntityId> = store
            .family_orders(&sibling)
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(family, HashSet::from([root.id, sibling.id]));
    }

    #[test]
    fn stock_updates_require_a_seeded_item() {
        let store = InMemoryEntityStore::new();
        let global = StoreId::global();
        let mut item = StockItem::new("ABC", 5);

        assert!(store.update_stock_item(&global, &item).is_err());

        store.insert_stock_item(&global, item.clone()).unwrap();
        item.available = 9;
        store.update_stock_item(&global, &item).unwrap();
        assert_eq!(
            store.find_stock_item(&global, "ABC").unwrap().map(|s| s.available),
            Some(9)
        );
    }
}
