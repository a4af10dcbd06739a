//! Column models for the two production grids: Leads and Listings.

use super::{Align, ColumnDescriptor, ColumnSet, PriceShape, SelectOption, ValueType};

/// Transaction-type field consulted by the listing price column.
pub const TRANSACTION_TYPE_FIELD: &str = "transaction_type";

pub const TRANSACTION_SALE: &str = "SALE";
pub const TRANSACTION_JEONSE: &str = "JEONSE";
pub const TRANSACTION_MONTHLY: &str = "MONTHLY_RENT";

pub fn lead_stage_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("신규", "NEW"),
        SelectOption::new("진행중", "IN_PROGRESS"),
        SelectOption::new("계약", "CONTRACTED"),
        SelectOption::new("종료", "CLOSED"),
    ]
}

pub fn transaction_type_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("매매", TRANSACTION_SALE),
        SelectOption::new("전세", TRANSACTION_JEONSE),
        SelectOption::new("월세", TRANSACTION_MONTHLY),
    ]
}

pub fn listing_status_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("거래가능", "AVAILABLE"),
        SelectOption::new("예약중", "RESERVED"),
        SelectOption::new("거래완료", "SOLD"),
    ]
}

/// Columns of the Leads grid.
pub fn lead_columns() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnDescriptor::new("name", "이름", ValueType::Text)
            .width(140.0)
            .bounds(100.0, 300.0)
            .pinned()
            .editable()
            .required(),
        ColumnDescriptor::new("phone", "연락처", ValueType::Phone)
            .width(150.0)
            .bounds(120.0, 220.0)
            .editable(),
        ColumnDescriptor::new("stage", "단계", ValueType::Select)
            .width(110.0)
            .bounds(90.0, 200.0)
            .align(Align::Center, Align::Center)
            .options(lead_stage_options())
            .editable(),
        ColumnDescriptor::new("budget", "예산", ValueType::Price(PriceShape::Range))
            .width(180.0)
            .bounds(120.0, 320.0)
            .editable(),
        ColumnDescriptor::new("preferred_area", "희망 면적", ValueType::Area)
            .width(160.0)
            .bounds(120.0, 260.0)
            .editable(),
        ColumnDescriptor::new("region", "희망 지역", ValueType::Text)
            .width(160.0)
            .editable(),
        ColumnDescriptor::new("memo", "메모", ValueType::Text)
            .width(240.0)
            .bounds(120.0, 600.0)
            .editable()
            .hidden(),
        ColumnDescriptor::new("created_at", "등록일", ValueType::Date)
            .width(120.0)
            .bounds(100.0, 180.0)
            .align(Align::Center, Align::Center),
    ])
}

/// Columns of the Listings grid.
pub fn listing_columns() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnDescriptor::new("title", "매물명", ValueType::Text)
            .width(200.0)
            .bounds(120.0, 400.0)
            .pinned()
            .editable()
            .required(),
        ColumnDescriptor::new(TRANSACTION_TYPE_FIELD, "거래유형", ValueType::Select)
            .width(100.0)
            .bounds(80.0, 160.0)
            .align(Align::Center, Align::Center)
            .options(transaction_type_options())
            .editable(),
        ColumnDescriptor::new(
            "price",
            "가격",
            ValueType::Price(PriceShape::ByTransaction {
                field: TRANSACTION_TYPE_FIELD.to_string(),
            }),
        )
        .width(180.0)
        .bounds(120.0, 300.0)
        .editable(),
        ColumnDescriptor::new("area", "면적", ValueType::Area)
            .width(160.0)
            .bounds(120.0, 260.0)
            .editable(),
        ColumnDescriptor::new("floor", "층", ValueType::Floor)
            .width(100.0)
            .bounds(80.0, 160.0)
            .editable(),
        ColumnDescriptor::new("address", "주소", ValueType::Text)
            .width(260.0)
            .bounds(160.0, 600.0)
            .editable(),
        ColumnDescriptor::new("status", "상태", ValueType::Select)
            .width(110.0)
            .bounds(90.0, 200.0)
            .align(Align::Center, Align::Center)
            .options(listing_status_options())
            .editable(),
        ColumnDescriptor::new("owner_phone", "소유주 연락처", ValueType::Phone)
            .width(150.0)
            .bounds(120.0, 220.0)
            .editable()
            .hidden(),
        ColumnDescriptor::new("created_at", "등록일", ValueType::Date)
            .width(120.0)
            .bounds(100.0, 180.0)
            .align(Align::Center, Align::Center),
    ])
}
