// Internationalization catalog for UI strings and API messages

use crate::language::Language;
use std::collections::{BTreeMap, HashMap};

const ZH: &[(&str, &str)] = &[
    ("nav.home", "首页"),
    ("nav.about", "关于企业"),
    ("nav.products", "产品展示"),
    ("nav.solutions", "解决方案"),
    ("nav.news", "新闻中心"),
    ("nav.contact", "联系我们"),
    ("nav.consultation", "预约一对一咨询"),
    ("nav.language", "中文"),
    ("home.hero.title", "精密液压解决方案"),
    ("home.hero.subtitle", "驱动未来工业"),
    (
        "home.hero.description",
        "专注液压泵、液压阀及液压附件制造15年，为全球客户提供可靠、高效的液压解决方案",
    ),
    ("home.hero.consultation", "立即咨询"),
    ("home.hero.products", "查看产品"),
    ("home.products.title", "核心产品"),
    ("home.products.subtitle", "专业的液压产品，满足各种工况需求"),
    ("home.products.viewAll", "查看全部产品"),
    ("home.news.title", "最新动态"),
    ("home.news.subtitle", "了解捷瀚液压最新资讯和行业动态"),
    ("home.news.viewAll", "查看更多新闻"),
    ("product.category.pump", "液压泵"),
    ("product.category.valve", "液压阀"),
    ("product.category.cylinder", "液压缸"),
    ("product.category.accessory", "液压附件"),
    ("product.viewDetails", "查看详情"),
    ("product.all", "全部产品"),
    ("product.search", "搜索产品..."),
    ("product.featured", "推荐"),
    ("news.category.company", "公司动态"),
    ("news.category.industry", "行业新闻"),
    ("news.category.product", "产品资讯"),
    ("news.all", "全部新闻"),
    ("news.search", "搜索新闻标题、内容..."),
    ("form.title", "预约一对一咨询"),
    ("form.name", "姓名"),
    ("form.nameRequired", "请输入姓名"),
    ("form.company", "公司名称"),
    ("form.phone", "联系电话"),
    ("form.phoneRequired", "请输入联系电话"),
    ("form.email", "邮箱地址"),
    ("form.emailRequired", "请输入邮箱地址"),
    ("form.message", "详细需求描述"),
    ("form.submit", "提交咨询"),
    (
        "form.success",
        "您的咨询已提交成功！我们将在24小时内与您联系。",
    ),
    ("form.error", "提交失败，请稍后重试或直接拨打我们的联系电话。"),
    ("common.learnMore", "了解更多"),
    ("common.contactUs", "联系我们"),
    ("common.loading", "加载中..."),
    ("common.copyright", "2025 捷瀚液压"),
    ("api.product_created", "产品创建成功"),
    ("api.product_updated", "产品更新成功"),
    ("api.product_deleted", "产品删除成功"),
    ("api.product_not_found", "未找到产品"),
    ("api.news_created", "新闻创建成功"),
    ("api.news_updated", "新闻更新成功"),
    ("api.news_deleted", "新闻删除成功"),
    ("api.news_not_found", "未找到新闻"),
    ("api.inquiry_not_found", "未找到咨询记录"),
    ("api.image_not_found", "未找到图片"),
    ("api.image_invalid_type", "请选择图片文件"),
    ("api.image_too_large", "图片大小不能超过5MB"),
    ("api.data_reset", "数据已重置为默认状态"),
    ("api.validation_error", "请检查你的输入"),
    ("api.server_error", "服务器发生错误"),
];

const EN: &[(&str, &str)] = &[
    ("nav.home", "Home"),
    ("nav.about", "About Us"),
    ("nav.products", "Products"),
    ("nav.solutions", "Solutions"),
    ("nav.news", "News"),
    ("nav.contact", "Contact"),
    ("nav.consultation", "Book Consultation"),
    ("nav.language", "English"),
    ("home.hero.title", "Precision Hydraulic Solutions"),
    ("home.hero.subtitle", "Driving Future Industry"),
    (
        "home.hero.description",
        "Specializing in hydraulic pumps, valves and accessories for 15 years, providing reliable and efficient hydraulic solutions for global customers",
    ),
    ("home.hero.consultation", "Get Quote"),
    ("home.hero.products", "View Products"),
    ("home.products.title", "Core Products"),
    (
        "home.products.subtitle",
        "Professional hydraulic products for various working conditions",
    ),
    ("home.products.viewAll", "View All Products"),
    ("home.news.title", "Latest News"),
    (
        "home.news.subtitle",
        "Stay updated with Jiehan Hydraulic news and industry trends",
    ),
    ("home.news.viewAll", "View More News"),
    ("product.category.pump", "Hydraulic Pumps"),
    ("product.category.valve", "Hydraulic Valves"),
    ("product.category.cylinder", "Hydraulic Cylinders"),
    ("product.category.accessory", "Hydraulic Accessories"),
    ("product.viewDetails", "View Details"),
    ("product.all", "All Products"),
    ("product.search", "Search products..."),
    ("product.featured", "Featured"),
    ("news.category.company", "Company News"),
    ("news.category.industry", "Industry News"),
    ("news.category.product", "Product News"),
    ("news.all", "All News"),
    ("news.search", "Search news title, content..."),
    ("form.title", "Book One-on-One Consultation"),
    ("form.name", "Name"),
    ("form.nameRequired", "Please enter your name"),
    ("form.company", "Company"),
    ("form.phone", "Phone"),
    ("form.phoneRequired", "Please enter your phone number"),
    ("form.email", "Email"),
    ("form.emailRequired", "Please enter your email"),
    ("form.message", "Detailed Requirements"),
    ("form.submit", "Submit Inquiry"),
    (
        "form.success",
        "Your inquiry has been submitted successfully! We will contact you within 24 hours.",
    ),
    (
        "form.error",
        "Submission failed, please try again later or call us directly.",
    ),
    ("common.learnMore", "Learn More"),
    ("common.contactUs", "Contact Us"),
    ("common.loading", "Loading..."),
    ("common.copyright", "2025 Jiehan Hydraulic"),
    ("api.product_created", "Product created successfully"),
    ("api.product_updated", "Product updated successfully"),
    ("api.product_deleted", "Product deleted successfully"),
    ("api.product_not_found", "Product not found"),
    ("api.news_created", "News article created successfully"),
    ("api.news_updated", "News article updated successfully"),
    ("api.news_deleted", "News article deleted successfully"),
    ("api.news_not_found", "News article not found"),
    ("api.inquiry_not_found", "Inquiry not found"),
    ("api.image_not_found", "Image not found"),
    ("api.image_invalid_type", "Please choose an image file"),
    ("api.image_too_large", "Images must not exceed 5MB"),
    ("api.data_reset", "Data has been reset to the defaults"),
    ("api.validation_error", "Please check your input"),
    ("api.server_error", "An error occurred on the server"),
];

pub struct I18n {
    messages: HashMap<Language, HashMap<&'static str, &'static str>>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}

impl I18n {
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert(Language::Zh, ZH.iter().copied().collect());
        messages.insert(Language::En, EN.iter().copied().collect());
        Self { messages }
    }

    /**
     * t
     * 先查当前语言，再回退到中文，都没有则原样返回 key。
     */
    pub fn t(&self, lang: Language, key: &str) -> String {
        [lang, Language::Zh]
            .iter()
            .find_map(|l| self.messages.get(l).and_then(|msgs| msgs.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    /// Full dictionary for `lang`, zh entries filling any gaps.
    pub fn catalog(&self, lang: Language) -> BTreeMap<&'static str, &'static str> {
        let mut merged: BTreeMap<&'static str, &'static str> = BTreeMap::new();
        for l in [Language::Zh, lang] {
            if let Some(msgs) = self.messages.get(&l) {
                merged.extend(msgs.iter().map(|(k, v)| (*k, *v)));
            }
        }
        merged
    }
}
