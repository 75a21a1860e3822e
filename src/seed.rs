use crate::store::{now_iso, Record, Tables};
use serde_json::{json, Value};

const DEFAULT_IMAGE: &str =
    "https://images.unsplash.com/photo-1581092160562-40aa08e78837?w=600&h=400&fit=crop";

fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: &str,
    name: (&str, &str),
    description: (&str, &str),
    category: &str,
    specifications: &str,
    features: &[&str],
    applications: &[&str],
    is_featured: bool,
    sort_order: i64,
    now: &str,
) -> Value {
    json!({
        "id": id,
        "name_zh": name.0,
        "name_en": name.1,
        "description_zh": description.0,
        "description_en": description.1,
        "category": category,
        "specifications": specifications,
        "features": features,
        "applications": applications,
        "image_url": DEFAULT_IMAGE,
        "is_featured": is_featured,
        "sort_order": sort_order,
        "created_at": now,
        "updated_at": now
    })
}

fn default_products(now: &str) -> Vec<Value> {
    vec![
        product(
            "1",
            ("单齿轮泵", "Single Gear Pump"),
            (
                "小型单齿轮泵，适用于低流量应用场景",
                "Small single gear pump, suitable for low flow applications",
            ),
            "液压泵",
            "排量: 0.5 ml/r\n最大压力: 25 MPa\n最大转速: 3000 rpm\n重量: 0.8 kg",
            &["结构紧凑", "性能稳定", "维护简便"],
            &["小型机械", "测试设备", "实验装置"],
            true,
            1,
            now,
        ),
        product(
            "2",
            ("双齿轮泵", "Double Gear Pump"),
            (
                "高效双齿轮泵，适用于中等流量应用",
                "High efficiency double gear pump, suitable for medium flow applications",
            ),
            "液压泵",
            "排量: 1.0 ml/r\n最大压力: 30 MPa\n最大转速: 2500 rpm\n重量: 1.2 kg",
            &["高效节能", "噪音低", "寿命长"],
            &["工程机械", "农业设备", "工业设备"],
            true,
            2,
            now,
        ),
        product(
            "3",
            ("溢流阀", "Relief Valve"),
            (
                "精密溢流阀，确保系统压力稳定",
                "Precision relief valve, ensuring stable system pressure",
            ),
            "液压阀",
            "压力范围: 0-40 MPa\n流量: 100 L/min\n响应时间: <10ms\n工作温度: -20°C to +80°C",
            &["响应快速", "压力稳定", "密封可靠"],
            &["液压系统", "压力控制", "安全保护"],
            false,
            3,
            now,
        ),
        product(
            "4",
            ("双作用液压缸", "Double-Acting Hydraulic Cylinder"),
            (
                "重载双作用液压缸，推拉双向输出",
                "Heavy-duty double-acting cylinder with push and pull output",
            ),
            "液压缸",
            "缸径: 63 mm\n行程: 500 mm\n额定压力: 21 MPa\n安装方式: 耳环",
            &["密封耐久", "输出平稳", "可定制行程"],
            &["工程机械", "冶金设备", "自动化产线"],
            false,
            4,
            now,
        ),
        product(
            "5",
            ("高压过滤器", "High-Pressure Filter"),
            (
                "高压管路过滤器，保护液压元件免受污染",
                "High-pressure line filter protecting components from contamination",
            ),
            "液压附件",
            "过滤精度: 10 μm\n额定压力: 32 MPa\n流量: 160 L/min",
            &["纳污量大", "压损低", "滤芯易更换"],
            &["液压站", "注塑机", "工程机械"],
            false,
            5,
            now,
        ),
    ]
}

fn default_news(now: &str) -> Vec<Value> {
    vec![json!({
        "id": "1",
        "title_zh": "捷瀚液压参加2024年国际液压展览会",
        "title_en": "Jiehan Hydraulic Participates in 2024 International Hydraulic Exhibition",
        "content_zh": "捷瀚液压将参加2024年国际液压展览会，展示最新的液压技术和产品...",
        "content_en": "Jiehan Hydraulic will participate in the 2024 International Hydraulic Exhibition, showcasing the latest hydraulic technologies and products...",
        "summary_zh": "捷瀚液压参加国际展览会，展示最新技术",
        "summary_en": "Jiehan Hydraulic participates in international exhibition, showcasing latest technology",
        "category": "公司新闻",
        "image_url": DEFAULT_IMAGE,
        "is_featured": true,
        "is_published": true,
        "published_at": now,
        "created_at": now,
        "updated_at": now
    })]
}

/**
 * default_tables
 * 默认示例数据：首次启动或重置时使用，时间戳取构造时刻。
 */
pub fn default_tables() -> Tables {
    let now = now_iso();
    let mut tables = Tables::new();
    tables.insert(
        "products".to_string(),
        default_products(&now)
            .into_iter()
            .filter_map(into_record)
            .collect(),
    );
    tables.insert(
        "news".to_string(),
        default_news(&now).into_iter().filter_map(into_record).collect(),
    );
    tables.insert("customer_inquiries".to_string(), Vec::new());
    tables
}
