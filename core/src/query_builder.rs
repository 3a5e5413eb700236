use crate::bind_value::BindValue;
use crate::error::{Result, SqlChainError};
use serde_json::Value;

/// 位置参数占位符
pub const POSITIONAL_MARKER: char = '?';

/// 查询类型，决定 prepare 时拼接哪些片段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    #[default]
    None,
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    /// 各查询类型的固定子句顺序
    pub fn clause_order(&self) -> &'static [ClauseKind] {
        match self {
            QueryKind::None => &[],
            QueryKind::Select => &[
                ClauseKind::Select,
                ClauseKind::From,
                ClauseKind::Join,
                ClauseKind::GroupBy,
                ClauseKind::Where,
                ClauseKind::OrderBy,
                ClauseKind::Limit,
                ClauseKind::Skip,
            ],
            QueryKind::Insert => &[ClauseKind::Insert],
            QueryKind::Update => &[
                ClauseKind::Update,
                ClauseKind::Where,
                ClauseKind::OrderBy,
                ClauseKind::Limit,
            ],
            QueryKind::Delete => &[
                ClauseKind::Delete,
                ClauseKind::Where,
                ClauseKind::OrderBy,
                ClauseKind::Limit,
            ],
        }
    }
}

/// SQL 子句类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Select,
    From,
    Join,
    GroupBy,
    Where,
    OrderBy,
    Limit,
    Skip,
    Insert,
    Update,
    Delete,
}

impl ClauseKind {
    /// 子句首次出现时输出的前缀
    fn prefix(&self) -> &'static str {
        match self {
            ClauseKind::Select => "SELECT ",
            ClauseKind::From => "FROM ",
            ClauseKind::Join => "JOIN ",
            ClauseKind::GroupBy => "GROUP BY ",
            ClauseKind::Where => "WHERE ",
            ClauseKind::OrderBy => "ORDER BY ",
            ClauseKind::Limit => "LIMIT ",
            ClauseKind::Skip => "OFFSET ",
            ClauseKind::Insert => "INSERT INTO ",
            ClauseKind::Update => "UPDATE ",
            ClauseKind::Delete => "DELETE FROM ",
        }
    }

    /// SELECT 列表后带一个空格，其余子句原样拼接
    fn suffix(&self) -> &'static str {
        match self {
            ClauseKind::Select => " ",
            _ => "",
        }
    }
}

/// 单个子句片段
///
/// `slots` 与 `text` 中的 `?` 一一对应：`Some` 是随条件一起给出的值，
/// `None` 在 prepare 时按顺序从 `set_parameters` 的值中取。
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub text: String,
    pub slots: Vec<Option<BindValue>>,
}

impl Clause {
    fn render(&self) -> String {
        format!("{}{}{}", self.kind.prefix(), self.text, self.kind.suffix())
    }
}

/// 片段式查询构建器
///
/// 每个逻辑查询持有自己的构建器，setter 把片段追加到对应子句，
/// `prepare` 按查询类型的固定顺序拼接出命令并清空片段。
/// 片段内容不做任何转义，值应通过参数列表传递。
///
/// ```rust,ignore
/// let mut q = QueryBuilder::make_query();
/// q.select("id,title").from("ads").where_("id>1").prepare();
/// assert_eq!(q.get_command(), "SELECT id,title FROM adsWHERE id>1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    clauses: Vec<Clause>,
    kind: QueryKind,
    command: String,
    params: Vec<BindValue>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始一个新查询
    pub fn make_query() -> Self {
        Self::new()
    }

    /// 清空片段、查询类型、命令和参数
    pub fn reset(&mut self) -> &mut Self {
        self.clauses.clear();
        self.kind = QueryKind::None;
        self.command.clear();
        self.params.clear();
        self
    }

    fn clause_mut(&mut self, kind: ClauseKind) -> &mut Clause {
        let index = match self.clauses.iter().position(|c| c.kind == kind) {
            Some(index) => index,
            None => {
                self.clauses.push(Clause {
                    kind,
                    text: String::new(),
                    slots: Vec::new(),
                });
                self.clauses.len() - 1
            }
        };
        &mut self.clauses[index]
    }

    /// 追加到已有子句；子句不存在时新建
    fn push_clause(&mut self, kind: ClauseKind, text: &str) {
        let clause = self.clause_mut(kind);
        clause.text.push_str(text);
        let markers = text.matches(POSITIONAL_MARKER).count();
        clause.slots.extend(std::iter::repeat(None).take(markers));
    }

    /// LIMIT / OFFSET 只保留最后一次设置
    fn replace_clause(&mut self, kind: ClauseKind, text: String) {
        let clause = self.clause_mut(kind);
        clause.text = text;
        clause.slots.clear();
    }

    /// 已有 WHERE 时用 `conjunction` 连接新条件
    fn push_condition(&mut self, conjunction: &str, field: &str, op: &str, value: BindValue) {
        let clause = self.clause_mut(ClauseKind::Where);
        if !clause.text.is_empty() {
            clause.text.push_str(&format!(" {} ", conjunction));
        }
        clause
            .text
            .push_str(&format!("{} {} {}", field, op, POSITIONAL_MARKER));
        clause.slots.push(Some(value));
    }

    pub fn select(&mut self, columns: &str) -> &mut Self {
        self.kind = QueryKind::Select;
        self.push_clause(ClauseKind::Select, columns);
        self
    }

    pub fn from(&mut self, table: &str) -> &mut Self {
        self.push_clause(ClauseKind::From, table);
        self
    }

    pub fn join(&mut self, clause: &str) -> &mut Self {
        self.push_clause(ClauseKind::Join, clause);
        self
    }

    pub fn group_by(&mut self, columns: &str) -> &mut Self {
        self.push_clause(ClauseKind::GroupBy, columns);
        self
    }

    /// WHERE 片段，`where` 是关键字所以带下划线
    pub fn where_(&mut self, condition: &str) -> &mut Self {
        self.push_clause(ClauseKind::Where, condition);
        self
    }

    /// `field op ?` 形式的条件，值绑定在该占位符上；已有 WHERE 时以 AND 连接
    pub fn where_cmp(&mut self, field: &str, op: &str, value: impl Into<BindValue>) -> &mut Self {
        self.push_condition("AND", field, op, value.into());
        self
    }

    /// 同 `where_cmp`，已有 WHERE 时以 OR 连接
    pub fn or_where_cmp(
        &mut self,
        field: &str,
        op: &str,
        value: impl Into<BindValue>,
    ) -> &mut Self {
        self.push_condition("OR", field, op, value.into());
        self
    }

    pub fn order_by(&mut self, columns: &str) -> &mut Self {
        self.push_clause(ClauseKind::OrderBy, columns);
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.replace_clause(ClauseKind::Limit, n.to_string());
        self
    }

    pub fn skip(&mut self, n: u64) -> &mut Self {
        self.replace_clause(ClauseKind::Skip, n.to_string());
        self
    }

    /// 例如 `insert("ads (id, title) VALUES (?, ?)")`
    pub fn insert(&mut self, target: &str) -> &mut Self {
        self.kind = QueryKind::Insert;
        self.push_clause(ClauseKind::Insert, target);
        self
    }

    /// 例如 `update("ads SET title = ?")`
    pub fn update(&mut self, target: &str) -> &mut Self {
        self.kind = QueryKind::Update;
        self.push_clause(ClauseKind::Update, target);
        self
    }

    pub fn delete(&mut self, table: &str) -> &mut Self {
        self.kind = QueryKind::Delete;
        self.push_clause(ClauseKind::Delete, table);
        self
    }

    /// 按当前查询类型拼接命令，拼接后所有片段被清空
    ///
    /// 参数按占位符在命令中的顺序重排：条件自带的值放在原位，
    /// 其余占位符依次取 `set_parameters` 的值，多出的值追加在末尾。
    pub fn prepare(&mut self) -> &mut Self {
        let mut command = String::new();
        let mut explicit = std::mem::take(&mut self.params).into_iter();
        let mut params = Vec::new();
        for kind in self.kind.clause_order() {
            if let Some(clause) = self.clauses.iter().find(|c| c.kind == *kind) {
                command.push_str(&clause.render());
                for slot in &clause.slots {
                    match slot {
                        Some(value) => params.push(value.clone()),
                        None => params.extend(explicit.next()),
                    }
                }
            }
        }
        params.extend(explicit);
        self.command = command;
        self.params = params;
        self.clauses.clear();
        self.kind = QueryKind::None;
        self
    }

    /// 按顺序追加参数
    pub fn set_parameters<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        self.params.extend(values.into_iter().map(Into::into));
        self
    }

    /// 从 JSON 追加参数，输入必须是标量数组；失败时参数列表保持不变
    pub fn set_parameters_json(&mut self, values: Value) -> Result<&mut Self> {
        let items = match values {
            Value::Array(items) => items,
            other => {
                return Err(SqlChainError::InvalidArgument(format!(
                    "parameters must be an array, got: {}",
                    other
                )))
            }
        };
        let binds = items
            .into_iter()
            .map(BindValue::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.params.extend(binds);
        Ok(self)
    }

    pub fn get_parameters(&self) -> &[BindValue] {
        &self.params
    }

    /// 直接设置命令，跳过片段拼接
    pub fn set_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.command = command.into();
        self
    }

    pub fn get_command(&self) -> &str {
        &self.command
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// 尚未 prepare 的片段
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// 命令中是否含有位置参数占位符
    pub fn has_positional_marker(&self) -> bool {
        self.command.contains(POSITIONAL_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========== SELECT 拼接测试 ==========
    #[test]
    fn test_select_from_where_literal_concat() {
        let mut q = QueryBuilder::make_query();
        q.select("id,title").from("ads").where_("id>1").prepare();
        assert_eq!(q.get_command(), "SELECT id,title FROM adsWHERE id>1");
        assert!(q.clauses().is_empty());
    }

    #[test]
    fn test_select_fixed_clause_order() {
        let mut q = QueryBuilder::make_query();
        // setter 调用顺序与输出顺序无关
        q.skip(20)
            .limit(10)
            .order_by(" id DESC ")
            .where_(" status = 1 ")
            .group_by(" category ")
            .join(" users ON users.id = ads.user_id ")
            .from("ads ")
            .select("ads.id");
        q.prepare();
        assert_eq!(
            q.get_command(),
            "SELECT ads.id FROM ads JOIN  users ON users.id = ads.user_id GROUP BY  category WHERE  status = 1 ORDER BY  id DESC LIMIT 10OFFSET 20"
        );
    }

    #[test]
    fn test_repeated_setter_appends_to_fragment() {
        let mut q = QueryBuilder::make_query();
        q.select("id").select(", title").from("ads ");
        q.where_("id > 1").where_(" AND status = 0");
        q.prepare();
        assert_eq!(
            q.get_command(),
            "SELECT id, title FROM ads WHERE id > 1 AND status = 0"
        );
    }

    #[test]
    fn test_limit_and_skip_replace() {
        let mut q = QueryBuilder::make_query();
        q.select("*").from("ads ").limit(5).limit(10).skip(3);
        q.prepare();
        assert_eq!(q.get_command(), "SELECT * FROM ads LIMIT 10OFFSET 3");
    }

    // ========== INSERT / UPDATE / DELETE 测试 ==========
    #[test]
    fn test_insert_ignores_read_fragments() {
        let mut q = QueryBuilder::make_query();
        q.insert("ads (id, title) VALUES (?, ?)")
            .where_("id > 1")
            .order_by("id")
            .set_parameters([BindValue::from(1), BindValue::from("hello")]);
        q.prepare();
        assert_eq!(q.get_command(), "INSERT INTO ads (id, title) VALUES (?, ?)");
        assert_eq!(q.get_parameters().len(), 2);
        assert!(q.clauses().is_empty());
    }

    #[test]
    fn test_update_order() {
        let mut q = QueryBuilder::make_query();
        q.limit(1)
            .where_("id = ? ")
            .update("ads SET title = ? ")
            .from("ignored")
            .set_parameters(["new", "x"]);
        q.prepare();
        assert_eq!(q.get_command(), "UPDATE ads SET title = ? WHERE id = ? LIMIT 1");
    }

    #[test]
    fn test_delete_order() {
        let mut q = QueryBuilder::make_query();
        q.delete("ads ").where_("id = 3 ").order_by("id ").limit(1).skip(9);
        q.prepare();
        assert_eq!(q.get_command(), "DELETE FROM ads WHERE id = 3 ORDER BY id LIMIT 1");
    }

    #[test]
    fn test_last_kind_setter_wins() {
        let mut q = QueryBuilder::make_query();
        q.select("id").from("ads ").delete("ads");
        assert_eq!(q.kind(), QueryKind::Delete);
        q.prepare();
        assert_eq!(q.get_command(), "DELETE FROM ads");
    }

    #[test]
    fn test_prepare_without_kind_yields_empty_command() {
        let mut q = QueryBuilder::make_query();
        q.from("ads").where_("id > 1").prepare();
        assert_eq!(q.get_command(), "");
        assert!(q.clauses().is_empty());
        assert_eq!(q.kind(), QueryKind::None);
    }

    #[test]
    fn test_prepare_clears_fragments_for_next_query() {
        let mut q = QueryBuilder::make_query();
        q.select("id ").from("ads").prepare();
        assert_eq!(q.get_command(), "SELECT id  FROM ads");
        q.select("title").prepare();
        assert_eq!(q.get_command(), "SELECT title ");
    }

    // ========== 参数测试 ==========
    #[test]
    fn test_where_cmp_binds_value() {
        let mut q = QueryBuilder::make_query();
        q.select("id, title, count").from("ads ").where_cmp("id", ">", 1);
        q.prepare();
        assert_eq!(q.get_command(), "SELECT id, title, count FROM ads WHERE id > ?");
        assert_eq!(q.get_parameters(), &[BindValue::Int64(1)]);
        assert!(q.has_positional_marker());
    }

    #[test]
    fn test_where_cmp_joins_with_and() {
        let mut q = QueryBuilder::make_query();
        q.select("id")
            .from("ads ")
            .where_cmp("id", ">", 1)
            .where_cmp("status", "=", 0);
        q.prepare();
        assert_eq!(
            q.get_command(),
            "SELECT id FROM ads WHERE id > ? AND status = ?"
        );
        assert_eq!(q.get_parameters(), &[BindValue::Int64(1), BindValue::Int64(0)]);
    }

    #[test]
    fn test_or_where_cmp_after_raw_condition() {
        let mut q = QueryBuilder::make_query();
        q.select("id")
            .from("ads ")
            .where_("is_del = 0")
            .or_where_cmp("id", "=", 3);
        q.prepare();
        assert_eq!(q.get_command(), "SELECT id FROM ads WHERE is_del = 0 OR id = ?");
        assert_eq!(q.get_parameters(), &[BindValue::Int64(3)]);
    }

    #[test]
    fn test_update_binds_follow_marker_order() {
        let mut q = QueryBuilder::make_query();
        q.update("ads SET title = ? ")
            .where_cmp("id", "=", 7)
            .set_parameters(["bike"]);
        q.prepare();
        assert_eq!(q.get_command(), "UPDATE ads SET title = ? WHERE id = ?");
        assert_eq!(
            q.get_parameters(),
            &[BindValue::String("bike".to_string()), BindValue::Int64(7)]
        );
    }

    #[test]
    fn test_mixed_raw_and_bound_markers_in_where() {
        let mut q = QueryBuilder::make_query();
        q.where_cmp("id", ">", 1)
            .where_(" AND title = ?")
            .select("id")
            .from("ads ")
            .limit(5)
            .set_parameters(["bike", "extra"]);
        q.prepare();
        assert_eq!(
            q.get_command(),
            "SELECT id FROM ads WHERE id > ? AND title = ?LIMIT 5"
        );
        assert_eq!(
            q.get_parameters(),
            &[
                BindValue::Int64(1),
                BindValue::String("bike".to_string()),
                BindValue::String("extra".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_parameters_keeps_order() {
        let mut q = QueryBuilder::make_query();
        q.set_parameters([1i64, 2, 3]).set_parameters(["a", "b"]);
        assert_eq!(
            q.get_parameters(),
            &[
                BindValue::Int64(1),
                BindValue::Int64(2),
                BindValue::Int64(3),
                BindValue::String("a".to_string()),
                BindValue::String("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_parameters_json_array() {
        let mut q = QueryBuilder::make_query();
        q.set_parameters_json(json!([1, "ads", null, true])).unwrap();
        assert_eq!(
            q.get_parameters(),
            &[
                BindValue::Int64(1),
                BindValue::String("ads".to_string()),
                BindValue::Null,
                BindValue::Bool(true),
            ]
        );
    }

    #[test]
    fn test_set_parameters_json_rejects_non_array() {
        let mut q = QueryBuilder::make_query();
        q.set_parameters([7]);
        let err = q.set_parameters_json(json!({"id": 1})).unwrap_err();
        assert!(matches!(err, SqlChainError::InvalidArgument(_)));
        let err = q.set_parameters_json(json!("1")).unwrap_err();
        assert!(matches!(err, SqlChainError::InvalidArgument(_)));
        assert_eq!(q.get_parameters(), &[BindValue::Int64(7)]);
    }

    #[test]
    fn test_set_parameters_json_partial_failure_does_not_mutate() {
        let mut q = QueryBuilder::make_query();
        let err = q.set_parameters_json(json!([1, [2]])).unwrap_err();
        assert!(matches!(err, SqlChainError::InvalidArgument(_)));
        assert!(q.get_parameters().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut q = QueryBuilder::make_query();
        q.select("id").from("ads").set_parameters([1]).set_command("SELECT 1");
        q.reset();
        assert!(q.clauses().is_empty());
        assert!(q.get_parameters().is_empty());
        assert_eq!(q.get_command(), "");
        assert_eq!(q.kind(), QueryKind::None);
    }

    // ========== 命令测试 ==========
    #[test]
    fn test_set_command() {
        let mut q = QueryBuilder::make_query();
        q.set_command("SELECT * FROM ads WHERE id = ?");
        assert_eq!(q.get_command(), "SELECT * FROM ads WHERE id = ?");
        assert!(q.has_positional_marker());
        q.set_command("SELECT 1");
        assert!(!q.has_positional_marker());
    }

    #[test]
    fn test_builders_are_independent() {
        let mut a = QueryBuilder::make_query();
        let mut b = QueryBuilder::make_query();
        a.select("id").from("ads");
        b.delete("users");
        a.prepare();
        b.prepare();
        assert_eq!(a.get_command(), "SELECT id FROM ads");
        assert_eq!(b.get_command(), "DELETE FROM users");
    }
}
