use crate::assertion::{ValuePath, extract_value, parse_value_path};
use crate::http::Response;
use crate::variable::types::VariableScope;
use crate::{Result, RucheckError};

/// 变量捕获指令：把响应中某个位置的值绑定到变量
///
/// 来源语法:
/// - `body` / `body.id` / `body.tags[0].name`
/// - `headers.X-Token` / `header.X-Token`
/// - `status`
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDirective {
    /// 变量名称
    pub name: String,

    /// 捕获来源
    pub source: ValuePath,
}

impl CaptureDirective {
    pub fn new(name: impl Into<String>, source: ValuePath) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// 解析捕获来源字符串
    pub fn parse(name: &str, source: &str) -> Result<Self> {
        let source = parse_value_path(source).map_err(|e| {
            RucheckError::InvalidAssertionSpec(format!("capture '{}': {}", name, e))
        })?;
        Ok(Self::new(name, source))
    }
}

/// 执行捕获，来源不存在时返回 `CapturePathMissing`
pub fn capture(
    scope: &mut VariableScope,
    directive: &CaptureDirective,
    response: &Response,
) -> Result<()> {
    let value = extract_value(response, &directive.source).ok_or_else(|| {
        RucheckError::CapturePathMissing(format!("{} <- {}", directive.name, directive.source))
    })?;
    scope.bind(directive.name.clone(), value);
    Ok(())
}
