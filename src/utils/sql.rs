use sea_orm::sea_query::LikeExpr;

/// 转义 LIKE 通配符，避免用户输入中的 `%` / `_` 被当作模式
pub fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `%input%` 子串匹配，带 ESCAPE 子句
pub fn like_contains(input: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like_pattern(input))).escape('\\')
}
