//! Sales dashboard aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{OrderId, OrderStatus, Price, ProductId};

/// One order as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub total: Price,
    pub lines: Vec<SaleLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub line_total: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub orders: u64,
    pub revenue: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub units: u64,
    pub revenue: Price,
}

/// Sales figures over a time window.
///
/// Cancelled orders appear in `cancelled_count` and `by_status` only; every
/// other figure counts non-cancelled orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub revenue: Price,
    pub order_count: u64,
    pub cancelled_count: u64,
    pub units_sold: u64,
    pub average_order_value: Price,
    /// Every status, zero-filled.
    pub by_status: Vec<StatusCount>,
    /// Every UTC day from `since` to `until`, zero-filled.
    pub daily: Vec<DailyRevenue>,
    pub top_products: Vec<ProductSales>,
}

impl SalesSummary {
    /// Aggregate the records created in `since..until`. Records outside the
    /// window are ignored.
    #[must_use]
    pub fn compute(
        records: &[SaleRecord],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        top_n: usize,
    ) -> Self {
        let mut by_status: BTreeMap<OrderStatus, u64> =
            OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut daily: BTreeMap<NaiveDate, DailyRevenue> = BTreeMap::new();
        let mut day = since.date_naive();
        let last_day = until.date_naive();
        while day <= last_day {
            daily.insert(
                day,
                DailyRevenue {
                    date: day,
                    orders: 0,
                    revenue: Price::zero(),
                },
            );
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        let mut products: BTreeMap<ProductId, ProductSales> = BTreeMap::new();

        let mut revenue = Price::zero();
        let mut order_count = 0u64;
        let mut units_sold = 0u64;

        for record in records
            .iter()
            .filter(|r| r.created_at >= since && r.created_at < until)
        {
            *by_status.entry(record.status).or_default() += 1;
            if !record.status.is_revenue() {
                continue;
            }
            revenue = revenue + record.total;
            order_count += 1;
            if let Some(day) = daily.get_mut(&record.created_at.date_naive()) {
                day.orders += 1;
                day.revenue = day.revenue + record.total;
            }
            for line in &record.lines {
                units_sold += u64::from(line.quantity);
                let entry = products
                    .entry(line.product_id)
                    .or_insert_with(|| ProductSales {
                        product_id: line.product_id,
                        product_name: line.product_name.clone(),
                        units: 0,
                        revenue: Price::zero(),
                    });
                entry.units += u64::from(line.quantity);
                entry.revenue = entry.revenue + line.line_total;
            }
        }

        let average_order_value = if order_count == 0 {
            Price::zero()
        } else {
            Price::new((revenue.amount() / Decimal::from(order_count)).round_dp(2))
                .unwrap_or_default()
        };

        let mut top_products: Vec<ProductSales> = products.into_values().collect();
        top_products.sort_by(|a, b| {
            b.units
                .cmp(&a.units)
                .then_with(|| b.revenue.cmp(&a.revenue))
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        top_products.truncate(top_n);

        Self {
            since,
            until,
            revenue,
            order_count,
            cancelled_count: by_status
                .get(&OrderStatus::Cancelled)
                .copied()
                .unwrap_or(0),
            units_sold,
            average_order_value,
            by_status: by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            daily: daily.into_values().collect(),
            top_products,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn record(id: i32, status: OrderStatus, created_at: DateTime<Utc>, lines: &[(i32, u32, &str)]) -> SaleRecord {
        let lines: Vec<SaleLine> = lines
            .iter()
            .map(|&(product, quantity, total)| SaleLine {
                product_id: ProductId::new(product),
                product_name: format!("Product {product}"),
                quantity,
                line_total: Price::parse(total).unwrap(),
            })
            .collect();
        SaleRecord {
            order_id: OrderId::new(id),
            status,
            created_at,
            total: lines.iter().map(|l| l.line_total).sum(),
            lines,
        }
    }

    #[test]
    fn test_summary_excludes_cancelled() {
        let records = vec![
            record(1, OrderStatus::Delivered, at(2, 9), &[(1, 2, "40.00")]),
            record(2, OrderStatus::Pending, at(2, 15), &[(2, 1, "15.00"), (1, 1, "20.00")]),
            record(3, OrderStatus::Cancelled, at(3, 10), &[(2, 5, "75.00")]),
        ];
        let summary = SalesSummary::compute(&records, at(1, 0), at(4, 0), 10);
        assert_eq!(summary.revenue, Price::parse("75.00").unwrap());
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.units_sold, 4);
        assert_eq!(summary.average_order_value, Price::parse("37.50").unwrap());
        assert_eq!(summary.top_products[0].product_id, ProductId::new(1));
        assert_eq!(summary.top_products[0].units, 3);
        assert_eq!(summary.top_products.len(), 2);
    }

    #[test]
    fn test_summary_zero_fills() {
        let summary = SalesSummary::compute(&[], at(1, 0), at(3, 12), 5);
        assert_eq!(summary.daily.len(), 3);
        assert!(summary.daily.iter().all(|d| d.revenue.is_zero()));
        assert_eq!(summary.by_status.len(), OrderStatus::ALL.len());
        assert!(summary.by_status.iter().all(|s| s.count == 0));
        assert!(summary.average_order_value.is_zero());
    }

    #[test]
    fn test_summary_window_and_daily_buckets() {
        let records = vec![
            record(1, OrderStatus::Shipped, at(1, 23), &[(1, 1, "10.00")]),
            record(2, OrderStatus::Shipped, at(2, 1), &[(1, 1, "10.00")]),
            record(3, OrderStatus::Shipped, at(2, 2), &[(1, 1, "10.00")]),
            record(4, OrderStatus::Shipped, at(5, 0), &[(1, 1, "10.00")]),
        ];
        let since = at(1, 0) + Duration::hours(12);
        let summary = SalesSummary::compute(&records, since, at(3, 0), 5);
        assert_eq!(summary.order_count, 3);
        let day2 = summary
            .daily
            .iter()
            .find(|d| d.date == at(2, 0).date_naive())
            .unwrap();
        assert_eq!(day2.orders, 2);
        assert_eq!(day2.revenue, Price::parse("20.00").unwrap());
    }

    #[test]
    fn test_top_products_tiebreak() {
        let records = vec![record(
            1,
            OrderStatus::Pending,
            at(1, 1),
            &[(3, 1, "5.00"), (2, 1, "9.00"), (1, 1, "9.00")],
        )];
        let summary = SalesSummary::compute(&records, at(1, 0), at(2, 0), 2);
        let ids: Vec<_> = summary.top_products.iter().map(|p| p.product_id).collect();
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(2)]);
    }
}
