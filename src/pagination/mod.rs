//! 游标分页
//!
//! 游标是 `{"values": {...}, "order": [...]}` 的 base64 编码（URL 安全字符集），
//! `values` 保存上一页最后一行在各排序列上的值，`order` 保存排序方式，
//! 形如 `likeCount_DESC`。游标里只出现对外的列名，真实的 SQL 列名由
//! [`SortColumn`] 白名单映射。

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{Postgres, QueryBuilder};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// 取“下一页”方向上的比较符
    fn operator(self) -> &'static str {
        match self {
            Direction::Asc => ">",
            Direction::Desc => "<",
        }
    }
}

/// 单个排序项，对应 `column_DIRECTION`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let invalid = || AppError::BadRequest("排序方式只能是 ASC 或 DESC".into());

        let (column, direction) = raw.rsplit_once('_').ok_or_else(invalid)?;
        let direction = match direction {
            "ASC" => Direction::Asc,
            "DESC" => Direction::Desc,
            _ => return Err(invalid()),
        };
        if column.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            column: column.to_string(),
            direction,
        })
    }
}

pub fn parse_order(raw: &[String]) -> AppResult<Vec<OrderBy>> {
    raw.iter().map(|o| OrderBy::parse(o)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub values: Map<String, Value>,
    pub order: Vec<String>,
}

impl Cursor {
    pub fn encode(&self) -> AppResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(format!("游标序列化失败: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// 解码并校验排序项；同时接受标准 base64
    pub fn decode(token: &str) -> AppResult<Self> {
        let invalid = || AppError::BadRequest("无效的游标".into());

        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim_end_matches('='))
            .or_else(|_| STANDARD.decode(token))
            .map_err(|_| invalid())?;
        let cursor: Cursor = serde_json::from_slice(&bytes).map_err(|_| invalid())?;

        parse_order(&cursor.order)?;
        Ok(cursor)
    }

    /// 由结果集最后一行生成游标，结果为空时表示没有下一页
    pub fn from_rows<T: Serialize>(rows: &[T], order: &[OrderBy]) -> AppResult<Option<Self>> {
        let Some(last) = rows.last() else {
            return Ok(None);
        };

        let row = serde_json::to_value(last)
            .map_err(|e| AppError::Internal(format!("游标序列化失败: {}", e)))?;

        let mut values = Map::new();
        for o in order {
            let value = row
                .get(&o.column)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("结果中缺少排序列 {}", o.column)))?;
            values.insert(o.column.clone(), value);
        }

        Ok(Some(Self {
            values,
            order: order
                .iter()
                .map(|o| format!("{}_{}", o.column, o.direction.as_sql()))
                .collect(),
        }))
    }
}

/// 生成下一页游标
pub fn next_cursor<T: Serialize>(rows: &[T], order: &[OrderBy]) -> AppResult<Option<String>> {
    match Cursor::from_rows(rows, order)? {
        Some(cursor) => Ok(Some(cursor.encode()?)),
        None => Ok(None),
    }
}

/// 允许排序的列
#[derive(Debug, Clone, Copy)]
pub struct SortColumn {
    /// 对外列名，也是结果 JSON 中的字段名
    pub name: &'static str,
    /// SQL 中的列表达式
    pub sql: &'static str,
    /// 绑定游标值时追加的类型转换，例如 `::timestamptz`
    pub cast: &'static str,
}

/// 把请求中的排序和游标转换成 SQL 片段
#[derive(Debug, Clone)]
pub struct CursorQuery {
    order: Vec<(SortColumn, Direction)>,
    after: Option<Vec<Value>>,
}

impl CursorQuery {
    /// 游标存在时以游标中的排序为准
    pub fn new(
        columns: &[SortColumn],
        order: &[String],
        cursor: Option<&str>,
    ) -> AppResult<Self> {
        let (raw_order, values) = match cursor.filter(|c| !c.is_empty()) {
            Some(token) => {
                let cursor = Cursor::decode(token)?;
                (cursor.order, Some(cursor.values))
            }
            None => (order.to_vec(), None),
        };

        let mut resolved = Vec::with_capacity(raw_order.len());
        for o in parse_order(&raw_order)? {
            let column = columns
                .iter()
                .find(|c| c.name == o.column)
                .copied()
                .ok_or_else(|| AppError::BadRequest(format!("不支持按 {} 排序", o.column)))?;
            resolved.push((column, o.direction));
        }

        let after = match values {
            Some(values) => {
                let mut ordered = Vec::with_capacity(resolved.len());
                for (column, _) in &resolved {
                    match values.get(column.name) {
                        Some(v) if is_scalar(v) => ordered.push(v.clone()),
                        _ => return Err(AppError::BadRequest("无效的游标".into())),
                    }
                }
                Some(ordered)
            }
            None => None,
        };

        Ok(Self {
            order: resolved,
            after,
        })
    }

    pub fn order(&self) -> Vec<OrderBy> {
        self.order
            .iter()
            .map(|(c, d)| OrderBy {
                column: c.name.to_string(),
                direction: *d,
            })
            .collect()
    }

    pub fn has_cursor(&self) -> bool {
        self.after.is_some()
    }

    /// 所有列同向时返回统一的比较符
    pub fn comparison_operator(&self) -> Option<&'static str> {
        let first = self.order.first()?.1;
        self.order
            .iter()
            .all(|(_, d)| *d == first)
            .then(|| first.operator())
    }

    /// 追加 ` AND <条件>`；没有游标时不追加
    pub fn push_condition(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let Some(values) = &self.after else {
            return;
        };
        if self.order.is_empty() {
            return;
        }

        qb.push(" AND ");
        match self.comparison_operator() {
            // 同向排序：行值比较 (a, b) < (x, y)
            Some(op) => {
                qb.push("(");
                for (i, (column, _)) in self.order.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    qb.push(column.sql);
                }
                qb.push(") ");
                qb.push(op);
                qb.push(" (");
                for (i, ((column, _), value)) in self.order.iter().zip(values).enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    push_value(qb, value, column.cast);
                }
                qb.push(")");
            }
            // 混合方向：展开成字典序 (a > x) OR (a = x AND b < y) ...
            None => {
                qb.push("(");
                for i in 0..self.order.len() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("(");
                    for j in 0..i {
                        let (column, _) = &self.order[j];
                        qb.push(column.sql);
                        qb.push(" = ");
                        push_value(qb, &values[j], column.cast);
                        qb.push(" AND ");
                    }
                    let (column, direction) = &self.order[i];
                    qb.push(column.sql);
                    qb.push(" ");
                    qb.push(direction.operator());
                    qb.push(" ");
                    push_value(qb, &values[i], column.cast);
                    qb.push(")");
                }
                qb.push(")");
            }
        }
    }

    /// 追加 ` ORDER BY ...`
    pub fn push_order_by(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.order.is_empty() {
            return;
        }

        qb.push(" ORDER BY ");
        for (i, (column, direction)) in self.order.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(column.sql);
            qb.push(" ");
            qb.push(direction.as_sql());
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value, cast: &str) {
    match value {
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                qb.push_bind(i);
            }
            None => {
                qb.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        // new() 已经排除了非标量
        _ => {
            qb.push("NULL");
        }
    }
    qb.push(cast);
}
