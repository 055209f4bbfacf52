use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::assertion::{Assertion, compile};
use crate::fixture::FixtureStore;
use crate::http::Method;
use crate::scenario::types::{FailurePolicy, FixtureRef, ScenarioDef, StepDef};
use crate::variable::{CaptureDirective, VariableResolver, VariableScope};
use crate::{Result, RucheckError};

/// 预检失败：出错的步骤与原因
#[derive(Debug)]
pub struct PlanError {
    pub step_index: usize,
    pub step_name: Option<String>,
    pub error: RucheckError,
}

/// 通过预检的场景：fixture 已解析，断言已编译，变量引用顺序已校验
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub name: String,
    pub failure_policy: Option<FailurePolicy>,
    pub steps: Vec<StepPlan>,
}

#[derive(Debug, Clone)]
pub struct StepPlan {
    pub index: usize,
    pub name: Option<String>,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, Value)>,
    /// fixture 与内联 body 合并后的模板
    pub body: Option<Value>,
    pub fail_on_status_code: bool,
    pub captures: Vec<CaptureDirective>,
    pub assertions: Vec<Assertion>,
}

/// 占位符替换后的请求描述
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub fail_on_status_code: bool,
}

impl ScenarioPlan {
    /// 预检场景
    ///
    /// 在发出任何请求前检查: fixture 均存在、断言定义合法、
    /// 第 k 步引用的变量都是种子变量或由前面的步骤捕获。
    pub fn build(
        scenario: &ScenarioDef,
        fixtures: &FixtureStore,
        seed: &HashMap<String, Value>,
    ) -> std::result::Result<Self, PlanError> {
        let mut available: HashSet<&str> = seed.keys().map(String::as_str).collect();
        let mut steps = Vec::with_capacity(scenario.steps.len());

        for (index, def) in scenario.steps.iter().enumerate() {
            let fail = |error: RucheckError| PlanError {
                step_index: index,
                step_name: def.name.clone(),
                error,
            };

            let step = StepPlan::build(index, def, fixtures).map_err(fail)?;

            if let Some(name) = step
                .placeholders()
                .into_iter()
                .find(|name| !available.contains(name.as_str()))
            {
                return Err(fail(RucheckError::UnboundVariable(name)));
            }

            available.extend(def.capture.iter().map(|(name, _)| name.as_str()));
            steps.push(step);
        }

        Ok(Self {
            name: scenario.name.clone(),
            failure_policy: scenario.failure_policy,
            steps,
        })
    }
}

impl StepPlan {
    fn build(index: usize, def: &StepDef, fixtures: &FixtureStore) -> Result<Self> {
        let body = merge_body(def, fixtures)?;
        if body.is_some() && !def.method.allows_body() {
            return Err(RucheckError::ParseError(format!(
                "{} 请求不能携带 fixture 或 body",
                def.method
            )));
        }

        let assertions = def
            .assertions
            .iter()
            .map(|definition| compile(definition).map_err(RucheckError::from))
            .collect::<Result<Vec<_>>>()?;

        let captures = def
            .capture
            .iter()
            .map(|(name, source)| CaptureDirective::parse(name, source))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            index,
            name: def.name.clone(),
            method: def.method,
            url: def.url.clone(),
            headers: def.headers.clone(),
            query: def.query.clone(),
            body,
            fail_on_status_code: def.fail_on_status_code,
            captures,
            assertions,
        })
    }

    /// 本步骤引用的所有变量名
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = VariableResolver::placeholders(&self.url);
        for (_, value) in &self.headers {
            names.extend(VariableResolver::placeholders(value));
        }
        for (_, value) in &self.query {
            names.extend(VariableResolver::value_placeholders(value));
        }
        if let Some(body) = &self.body {
            names.extend(VariableResolver::value_placeholders(body));
        }
        names
    }

    /// 用当前作用域替换所有占位符
    pub fn resolve(&self, scope: &VariableScope) -> Result<ResolvedStep> {
        let url = VariableResolver::resolve(&self.url, scope)?;

        let headers = self
            .headers
            .iter()
            .map(|(name, value)| -> Result<(String, String)> {
                Ok((name.clone(), VariableResolver::resolve(value, scope)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut query = Vec::with_capacity(self.query.len());
        for (name, template) in &self.query {
            match VariableResolver::resolve_value(template, scope)? {
                Value::Array(items) => {
                    query.extend(items.iter().map(|item| (name.clone(), query_text(item))));
                }
                value => query.push((name.clone(), query_text(&value))),
            }
        }

        let body = self
            .body
            .as_ref()
            .map(|body| VariableResolver::resolve_value(body, scope))
            .transpose()?;

        Ok(ResolvedStep {
            method: self.method,
            url,
            headers,
            query,
            body,
            fail_on_status_code: self.fail_on_status_code,
        })
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.method, self.url),
        }
    }
}

/// 合并 fixture 与内联 body
///
/// 列表形式的 fixture 组成 JSON 数组；body 与 fixture 都是对象时，
/// body 的键覆盖 fixture 副本中的同名键。
fn merge_body(def: &StepDef, fixtures: &FixtureStore) -> Result<Option<Value>> {
    let fixture = match &def.fixture {
        None => None,
        Some(reference) => {
            let mut documents = reference
                .names()
                .into_iter()
                .map(|name| fixtures.load(name).map(|f| f.as_ref().clone()))
                .collect::<Result<Vec<_>>>()?;
            match reference {
                FixtureRef::One(_) => documents.pop(),
                FixtureRef::Many(_) => Some(Value::Array(documents)),
            }
        }
    };

    match (fixture, &def.body) {
        (None, body) => Ok(body.clone()),
        (Some(fixture), None) => Ok(Some(fixture)),
        (Some(Value::Object(mut base)), Some(Value::Object(overrides))) => {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
            Ok(Some(Value::Object(base)))
        }
        (Some(_), Some(_)) => Err(RucheckError::ParseError(
            "fixture 与 body 只有在都是对象时才能合并".to_string(),
        )),
    }
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
